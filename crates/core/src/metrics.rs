//! Metrics collection and reporting for simulated transmissions.
//!
//! This module makes the effect of the channel observable:
//! - Physical layer volume (bits, symbols, OFDM blocks)
//! - Bit and symbol errors against the sender's ground truth
//! - End-to-end outcome per message (delivered intact, corrupted, auth failure)
//!
//! # Design
//!
//! The driver updates a `Metrics` value explicitly after each stage, the
//! same way it steps through the layers. Nothing in the stack writes here.
//!
//! # Thread Safety
//!
//! Not thread-safe. Use one `Metrics` per driver thread and `merge` them.

use std::time::{Duration, Instant};

use crate::stack::PhysicalPayload;

/// Counters for one or more simulated transmissions.
#[derive(Debug, Clone)]
pub struct Metrics {
    // === Timing ===
    /// When collection started
    pub start_time: Instant,

    /// When collection ended (set on completion)
    pub end_time: Option<Instant>,

    // === Messages ===
    /// Messages pushed through the physical layer
    pub messages_sent: u64,

    /// Messages whose received text equals the sent text
    pub messages_intact: u64,

    /// Messages that arrived with different content
    pub messages_corrupted: u64,

    /// Messages whose presentation layer failed authentication
    pub auth_failures: u64,

    /// Plaintext bytes handed to the application layer
    pub plaintext_bytes: u64,

    // === Physical layer ===
    /// Link-layer bytes handed to the physical layer
    pub frame_bytes: u64,

    /// Payload bits before parity padding
    pub bits_transmitted: u64,

    /// QPSK symbols carrying payload (excluding block padding)
    pub symbols_transmitted: u64,

    /// OFDM blocks sent
    pub blocks_transmitted: u64,

    /// Payload bits that flipped in the channel
    pub bit_errors: u64,

    /// Payload symbols decided as the wrong constellation point
    pub symbol_errors: u64,
}

impl Metrics {
    /// Create new metrics with start time set to now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            messages_sent: 0,
            messages_intact: 0,
            messages_corrupted: 0,
            auth_failures: 0,
            plaintext_bytes: 0,
            frame_bytes: 0,
            bits_transmitted: 0,
            symbols_transmitted: 0,
            blocks_transmitted: 0,
            bit_errors: 0,
            symbol_errors: 0,
        }
    }

    /// Mark collection as complete.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Get total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Account for one pass through the physical layer.
    pub fn record_physical(&mut self, payload: &PhysicalPayload) {
        self.messages_sent += 1;
        self.frame_bytes += payload.data.len() as u64;
        self.bits_transmitted += payload.bit_len as u64;
        self.symbols_transmitted += payload.constellation.len() as u64;
        self.blocks_transmitted += payload.blocks as u64;
        self.bit_errors += payload.bit_errors as u64;
        self.symbol_errors += payload.symbol_errors as u64;
    }

    /// Account for the end-to-end outcome of one message.
    pub fn record_delivery(&mut self, sent: &str, received: &str) {
        self.plaintext_bytes += sent.len() as u64;
        if sent == received {
            self.messages_intact += 1;
        } else {
            self.messages_corrupted += 1;
        }
    }

    /// Count a presentation-layer authentication failure.
    pub fn record_auth_failure(&mut self) {
        self.auth_failures += 1;
    }

    /// Fold another set of counters into this one.
    ///
    /// Keeps the earlier start time; the end time is left untouched.
    pub fn merge(&mut self, other: &Metrics) {
        self.start_time = self.start_time.min(other.start_time);
        self.messages_sent += other.messages_sent;
        self.messages_intact += other.messages_intact;
        self.messages_corrupted += other.messages_corrupted;
        self.auth_failures += other.auth_failures;
        self.plaintext_bytes += other.plaintext_bytes;
        self.frame_bytes += other.frame_bytes;
        self.bits_transmitted += other.bits_transmitted;
        self.symbols_transmitted += other.symbols_transmitted;
        self.blocks_transmitted += other.blocks_transmitted;
        self.bit_errors += other.bit_errors;
        self.symbol_errors += other.symbol_errors;
    }

    /// Bit-error rate (bit errors / bits transmitted).
    pub fn bit_error_rate(&self) -> f64 {
        if self.bits_transmitted == 0 {
            0.0
        } else {
            self.bit_errors as f64 / self.bits_transmitted as f64
        }
    }

    /// Symbol-error rate (symbol errors / symbols transmitted).
    pub fn symbol_error_rate(&self) -> f64 {
        if self.symbols_transmitted == 0 {
            0.0
        } else {
            self.symbol_errors as f64 / self.symbols_transmitted as f64
        }
    }

    /// Fraction of messages that arrived intact.
    pub fn delivery_rate(&self) -> f64 {
        let delivered = self.messages_intact + self.messages_corrupted;
        if delivered == 0 {
            0.0
        } else {
            self.messages_intact as f64 / delivered as f64
        }
    }

    /// Header and cipher overhead (frame bytes / plaintext bytes).
    pub fn overhead_ratio(&self) -> f64 {
        if self.plaintext_bytes == 0 {
            0.0
        } else {
            self.frame_bytes as f64 / self.plaintext_bytes as f64
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Transmission Summary ===");
        println!("Duration: {} ms", self.duration().as_millis());
        println!();

        println!("=== Messages ===");
        println!("Sent: {}", self.messages_sent);
        println!("Intact: {} ({:.2}%)", self.messages_intact, self.delivery_rate() * 100.0);
        println!("Corrupted: {}", self.messages_corrupted);
        println!("Authentication failures: {}", self.auth_failures);
        println!("Plaintext bytes: {}", self.plaintext_bytes);
        println!("Frame bytes: {} ({:.2}x plaintext)", self.frame_bytes, self.overhead_ratio());
        println!();

        println!("=== Physical Layer ===");
        println!("Bits: {}", self.bits_transmitted);
        println!("Symbols: {}", self.symbols_transmitted);
        println!("OFDM blocks: {}", self.blocks_transmitted);
        println!("Bit errors: {} (BER {:.3e})", self.bit_errors, self.bit_error_rate());
        println!("Symbol errors: {} (SER {:.3e})", self.symbol_errors, self.symbol_error_rate());
        println!();
    }

    /// Print just the final result (pass/fail).
    pub fn print_result(&self) {
        if self.messages_corrupted == 0 && self.auth_failures == 0 {
            println!("✓ All {} messages received intact", self.messages_intact);
        } else if self.auth_failures > 0 {
            println!("✗ {} messages failed authentication", self.auth_failures);
        } else {
            println!(
                "✗ {} of {} messages corrupted ({} bit errors)",
                self.messages_corrupted,
                self.messages_intact + self.messages_corrupted,
                self.bit_errors
            );
        }
    }

    /// Export metrics as a simple text format (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "duration_ms={}\n\
             messages_sent={}\n\
             messages_intact={}\n\
             messages_corrupted={}\n\
             auth_failures={}\n\
             bits_transmitted={}\n\
             bit_errors={}\n\
             bit_error_rate={:.6}\n\
             symbols_transmitted={}\n\
             symbol_errors={}\n\
             blocks_transmitted={}\n",
            self.duration().as_millis(),
            self.messages_sent,
            self.messages_intact,
            self.messages_corrupted,
            self.auth_failures,
            self.bits_transmitted,
            self.bit_errors,
            self.bit_error_rate(),
            self.symbols_transmitted,
            self.symbol_errors,
            self.blocks_transmitted,
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
