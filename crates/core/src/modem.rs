//! OFDM-style block modem.
//!
//! Symbols are treated as frequency-domain subcarrier values. The modem
//! splits them into blocks of `block_size`, runs an inverse DFT per block to
//! get time-domain samples, and concatenates the blocks. Demodulation cuts
//! the received signal at the same boundaries and runs the forward DFT.
//!
//! # Conventions
//!
//! - Inverse transform is scaled by `1/N`, forward transform is not, so the
//!   pair is an exact inverse up to floating-point rounding
//! - The last block is zero-padded on the symbol side
//! - No cyclic prefix; blocks do not interact
//!
//! Blocks are independent and could be transformed in parallel, as long as
//! the output keeps block order. This implementation runs them in sequence.

use std::sync::Arc;

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use crate::error::{Error, Result};
use crate::mapper::Symbol;

/// Default number of subcarriers per block.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Inverse/forward DFT pair for a fixed block size.
#[derive(Clone)]
pub struct BlockModem {
    block_size: usize,
    inverse: Arc<dyn Fft<f64>>,
    forward: Arc<dyn Fft<f64>>,
}

impl BlockModem {
    /// Plan transforms for `block_size` subcarriers.
    ///
    /// # Errors
    /// `Error::Config` if `block_size` is zero.
    pub fn new(block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::Config("block size must be at least 1".to_string()));
        }

        let mut planner = FftPlanner::<f64>::new();
        Ok(Self {
            block_size,
            inverse: planner.plan_fft_inverse(block_size),
            forward: planner.plan_fft_forward(block_size),
        })
    }

    /// Number of blocks needed to carry `symbol_count` symbols.
    pub fn block_count(&self, symbol_count: usize) -> usize {
        symbol_count.div_ceil(self.block_size)
    }

    /// Frequency-domain symbols to a time-domain signal.
    ///
    /// Output length is `block_count(symbols.len()) * block_size`.
    pub fn modulate(&self, symbols: &[Symbol]) -> Vec<Complex64> {
        let scale = 1.0 / self.block_size as f64;
        let mut signal = Vec::with_capacity(self.block_count(symbols.len()) * self.block_size);

        for block in symbols.chunks(self.block_size) {
            let start = signal.len();
            signal.extend_from_slice(block);
            signal.resize(start + self.block_size, Complex64::new(0.0, 0.0));

            let segment = &mut signal[start..];
            self.inverse.process(segment);
            for sample in segment.iter_mut() {
                *sample *= scale;
            }
        }

        signal
    }

    /// Time-domain signal back to symbol estimates.
    ///
    /// A ragged tail is zero-padded to a full block, so the output length is
    /// always a multiple of `block_size`. The caller drops padding symbols.
    pub fn demodulate(&self, signal: &[Complex64]) -> Vec<Symbol> {
        let mut symbols = Vec::with_capacity(self.block_count(signal.len()) * self.block_size);

        for segment in signal.chunks(self.block_size) {
            let start = symbols.len();
            symbols.extend_from_slice(segment);
            symbols.resize(start + self.block_size, Complex64::new(0.0, 0.0));
            self.forward.process(&mut symbols[start..]);
        }

        symbols
    }
}

impl std::fmt::Debug for BlockModem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockModem")
            .field("block_size", &self.block_size)
            .finish()
    }
}
