//! ofdm-sim: step through a seven-layer transmission from the command line.
//!
//! `send` plays the sender (Alice) and the receiver (Bob) for one message
//! and prints the payload after every layer. `sweep` pushes generated
//! messages through a range of noise levels and reports the error rates.

mod config;
mod input_gen;

use std::process::ExitCode;

use clap::Parser;
use ofdm_sim_core::{
    mapper,
    metrics::Metrics,
    stack::{mark_corrupted, Layer, Payload, PhysicalPayload, ProtocolStack, StackConfig},
    SharedKey,
};
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, Config, Mode};

/// Longest payload shown in full by the inspector.
const PREVIEW_BYTES: usize = 60;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = init_logging(&config.log_level) {
        eprintln!("error: {e}");
        return ExitCode::from(2);
    }

    if config.print_config {
        config.print();
    }

    let result = match &config.mode {
        Mode::Send {
            message,
            key,
            wrong_key,
        } => run_send(&config, message, key.clone(), *wrong_key),
        Mode::Sweep {
            levels,
            trials,
            message_len,
        } => run_sweep(&config, levels, *trials, *message_len),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) -> Result<(), String> {
    let level: tracing::Level = level
        .parse()
        .map_err(|_| format!("unknown log level: {level}"))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| format!("failed to set logger: {e}"))
}

/// Alice sends, Bob receives, every layer printed.
fn run_send(
    config: &Config,
    message: &str,
    key: Option<SharedKey>,
    wrong_key: bool,
) -> ofdm_sim_core::Result<()> {
    let mut alice = ProtocolStack::new(key, config.stack)?;
    let bob_key = if wrong_key {
        SharedKey::generate()
    } else {
        alice.key().clone()
    };
    let bob = ProtocolStack::new(Some(bob_key), config.stack)?;

    tracing::info!(
        seed = config.seed,
        noise_std = config.stack.noise_std,
        "starting transmission"
    );

    let mut metrics = Metrics::new();

    println!("=== Alice sends (L7 -> L1) ===");
    let mut payload = Payload::Text(message.to_string());
    for layer in Layer::SEND_ORDER.into_iter().filter(|&l| l != Layer::Physical) {
        payload = alice.encode_step(layer, payload);
        show_payload(layer, &payload);
    }

    let signal = alice.l1_modulate(&payload.into_bytes());
    show_payload(Layer::Physical, &Payload::Signal(signal.clone()));
    metrics.record_physical(&signal);
    show_constellation(&signal);

    let channel = alice.channel().stats();
    println!(
        "    channel: {} transmissions, {} time-domain samples",
        channel.transmissions, channel.samples
    );

    println!();
    println!("=== Bob receives (L1 -> L7) ===");
    let received = deliver(&bob, signal, &mut metrics, true);
    metrics.record_delivery(message, &received);
    metrics.complete();

    println!();
    println!("Alice sent:    {message:?}");
    println!("Bob received:  {received:?}");

    if config.print_metrics {
        metrics.print_summary();
    }
    metrics.print_result();
    Ok(())
}

/// Bit-error rate per noise level over generated messages.
fn run_sweep(
    config: &Config,
    levels: &[f64],
    trials: usize,
    message_len: usize,
) -> ofdm_sim_core::Result<()> {
    let messages = input_gen::generate_messages(config.seed, trials, message_len);
    let mut total = Metrics::new();

    println!(
        "{:>10} {:>10} {:>12} {:>12} {:>10} {:>10}",
        "noise_std", "bits", "bit_errors", "BER", "intact", "auth_fail"
    );

    for &noise_std in levels {
        let stack_config = StackConfig {
            noise_std,
            ..config.stack
        };
        let mut alice = ProtocolStack::new(None, stack_config)?;
        let bob = ProtocolStack::new(Some(alice.key().clone()), stack_config)?;

        let mut metrics = Metrics::new();
        for message in &messages {
            let signal = alice.send(message);
            metrics.record_physical(&signal);
            let received = deliver(&bob, signal, &mut metrics, false);
            metrics.record_delivery(message, &received);
        }
        metrics.complete();

        tracing::debug!(noise_std, ber = metrics.bit_error_rate(), "noise level done");

        println!(
            "{:>10.4} {:>10} {:>12} {:>12.3e} {:>9.1}% {:>10}",
            noise_std,
            metrics.bits_transmitted,
            metrics.bit_errors,
            metrics.bit_error_rate(),
            metrics.delivery_rate() * 100.0,
            metrics.auth_failures
        );
        total.merge(&metrics);
    }
    total.complete();

    if config.print_metrics {
        total.print_summary();
    }
    tracing::debug!(totals = %total.export_text().replace('\n', " "), "sweep complete");
    Ok(())
}

/// Run the receiver layers, recording authentication failures.
fn deliver(
    bob: &ProtocolStack,
    signal: PhysicalPayload,
    metrics: &mut Metrics,
    show: bool,
) -> String {
    let mut payload = Payload::Signal(signal);
    for layer in Layer::RECEIVE_ORDER {
        payload = match layer {
            Layer::Presentation => {
                let bytes = payload.into_bytes();
                match bob.l6_decrypt_checked(&bytes) {
                    Ok(plaintext) => Payload::Bytes(plaintext),
                    Err(_) => {
                        metrics.record_auth_failure();
                        Payload::Bytes(mark_corrupted(&bytes))
                    }
                }
            }
            _ => bob.decode_step(layer, payload),
        };
        if show {
            show_payload(layer, &payload);
        }
    }
    payload.into_text()
}

/// One line of the payload inspector.
fn show_payload(layer: Layer, payload: &Payload) {
    let shown = match payload {
        Payload::Text(text) => format!("{text:?}"),
        Payload::Bytes(bytes) => preview(bytes),
        Payload::Signal(signal) => format!(
            "{} bits (+{} pad) as {} symbols in {} OFDM blocks, demodulated to {} bytes",
            signal.bit_len,
            signal.padded_bit_len - signal.bit_len,
            signal.constellation.len(),
            signal.blocks,
            signal.data.len()
        ),
    };
    println!("[{layer}] -> {shown}");
}

fn preview(bytes: &[u8]) -> String {
    if bytes.len() > PREVIEW_BYTES {
        format!(
            "b\"{}\"... (len={})",
            bytes[..PREVIEW_BYTES].escape_ascii(),
            bytes.len()
        )
    } else {
        format!("b\"{}\"", bytes.escape_ascii())
    }
}

/// Text stand-in for the constellation plot.
fn show_constellation(signal: &PhysicalPayload) {
    if signal.constellation.is_empty() {
        return;
    }

    // Mean distance from each received point to the point it was decided as
    let spread = signal
        .constellation
        .iter()
        .map(|&rx| (rx - mapper::map(mapper::demap(rx))).norm())
        .sum::<f64>()
        / signal.constellation.len() as f64;

    println!(
        "    constellation: {} points, mean spread {:.4}, {} symbol errors, {} bit errors",
        signal.constellation.len(),
        spread,
        signal.symbol_errors,
        signal.bit_errors
    );
    for rx in signal.constellation.iter().take(4) {
        let (hi, lo) = mapper::demap(*rx);
        println!(
            "    {:+.3}{:+.3}j -> ({}, {})",
            rx.re, rx.im, hi as u8, lo as u8
        );
    }
}
