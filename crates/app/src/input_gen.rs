//! Message generation for noise sweeps.
//!
//! A sweep needs many plaintexts. They are generated from a seed so a sweep
//! can be repeated exactly.
//!
//! # Design
//!
//! Generated messages mix:
//! - Plain words from a small vocabulary (ASCII, one byte per char)
//! - Occasional multi-byte characters, so bit errors can split a UTF-8
//!   sequence and exercise the lossy final decode

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const WORDS: &[&str] = &[
    "hello", "bob", "alice", "ofdm", "qpsk", "carrier", "symbol", "block", "noise", "frame",
    "session", "packet", "signal", "channel", "layer",
];

const WIDE: &[char] = &['é', 'ß', 'λ', 'ω', '✓', '→'];

/// Generate one message of exactly `len` characters.
pub fn generate_message(rng: &mut ChaCha8Rng, len: usize) -> String {
    let mut message = String::with_capacity(len);
    let mut chars = 0;

    while chars < len {
        // 10% multi-byte characters
        if rng.gen_range(0..10) == 0 {
            message.push(WIDE[rng.gen_range(0..WIDE.len())]);
            chars += 1;
            continue;
        }

        let word = WORDS[rng.gen_range(0..WORDS.len())];
        for c in word.chars().chain(std::iter::once(' ')) {
            if chars == len {
                break;
            }
            message.push(c);
            chars += 1;
        }
    }

    message
}

/// Generate `count` messages from a seed.
pub fn generate_messages(seed: u64, count: usize, len: usize) -> Vec<String> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count).map(|_| generate_message(&mut rng, len)).collect()
}
