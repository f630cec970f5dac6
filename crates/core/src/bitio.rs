//! Bit vectors for the physical layer.
//!
//! Bytes are unpacked into individual bits MSB-first (most significant bit
//! first), grouped into pairs for QPSK mapping, and packed back into bytes
//! on the receive side.
//!
//! # Padding Rules
//! - Before 2-bit grouping an odd-length vector gets a single trailing `0`
//! - The pre-padding length is remembered and used to strip that bit (and
//!   anything demodulation adds) on the way back up
//! - `to_bytes` zero-fills a trailing partial byte
//!
//! # Example
//! ```
//! use ofdm_sim_core::bitio::BitVector;
//!
//! let mut bits = BitVector::from_bytes(&[0b1011_0000]);
//! assert_eq!(bits.len(), 8);
//! assert!(!bits.pad_to_even());
//! assert_eq!(bits.pairs().next(), Some((true, false)));
//! assert_eq!(bits.to_bytes(), vec![0b1011_0000]);
//! ```

/// Ordered sequence of bits that remembers its pre-padding length.
///
/// # Invariants
/// - `original_len <= bits.len()` until the vector is truncated below it
/// - padding only ever appends bits, so `bits[..original_len]` is the payload
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BitVector {
    bits: Vec<bool>,
    original_len: usize,
}

impl BitVector {
    /// Unpack bytes MSB-first. Length is always a multiple of 8.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut bits = Vec::with_capacity(bytes.len() * 8);
        for &byte in bytes {
            for shift in (0..8).rev() {
                bits.push((byte >> shift) & 1 == 1);
            }
        }
        Self::from_bits(bits)
    }

    /// Wrap raw bits; their count becomes the original length.
    pub fn from_bits(bits: Vec<bool>) -> Self {
        let original_len = bits.len();
        Self { bits, original_len }
    }

    /// Rebuild a vector recovered from the channel, cut down to the sender's
    /// pre-padding length.
    pub fn recovered(mut bits: Vec<bool>, original_len: usize) -> Self {
        bits.truncate(original_len);
        Self {
            original_len: bits.len(),
            bits,
        }
    }

    /// Current number of bits (including any padding).
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether the vector holds no bits at all.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of bits before any padding was appended.
    pub fn original_len(&self) -> usize {
        self.original_len
    }

    /// Borrow the bits.
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Append a single `0` if the length is odd.
    ///
    /// Returns `true` if a pad bit was added.
    pub fn pad_to_even(&mut self) -> bool {
        if self.bits.len() % 2 == 1 {
            self.bits.push(false);
            true
        } else {
            false
        }
    }

    /// Iterate over consecutive bit pairs.
    ///
    /// A trailing unpaired bit is skipped; call `pad_to_even` first.
    pub fn pairs(&self) -> impl Iterator<Item = (bool, bool)> + '_ {
        self.bits.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }

    /// Drop everything past the original length.
    pub fn strip_padding(&mut self) {
        self.bits.truncate(self.original_len);
    }

    /// Pack bits MSB-first into bytes, zero-filling the last partial byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bits
            .chunks(8)
            .map(|chunk| {
                chunk
                    .iter()
                    .enumerate()
                    .fold(0u8, |byte, (i, &bit)| byte | ((bit as u8) << (7 - i)))
            })
            .collect()
    }

    /// Count positions where the two vectors differ.
    ///
    /// Bits present in only one of the vectors count as errors.
    pub fn count_differences(&self, other: &BitVector) -> usize {
        let common = self.bits.len().min(other.bits.len());
        let mismatched = self.bits[..common]
            .iter()
            .zip(&other.bits[..common])
            .filter(|(a, b)| a != b)
            .count();
        mismatched + self.bits.len().abs_diff(other.bits.len())
    }
}
