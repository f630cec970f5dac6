//! QPSK symbol mapping.
//!
//! Each pair of bits selects one corner of the square constellation:
//!
//! ```text
//!            Q
//!   (0,1)    |    (0,0)
//!  -1+1j     |    1+1j
//!  ----------+---------- I
//!  -1-1j     |    1-1j
//!   (1,1)    |    (1,0)
//! ```
//!
//! Adjacent quadrants differ in exactly one bit (Gray order), so the most
//! likely noise-induced decision error costs a single bit.

use num_complex::Complex64;

use crate::bitio::BitVector;

/// A constellation point.
pub type Symbol = Complex64;

/// Two bits, first bit most significant.
pub type BitPair = (bool, bool);

/// Constellation in decision order. Ties in `demap` go to the earliest entry.
pub const CONSTELLATION: [(BitPair, Symbol); 4] = [
    ((false, false), Complex64::new(1.0, 1.0)),
    ((false, true), Complex64::new(-1.0, 1.0)),
    ((true, true), Complex64::new(-1.0, -1.0)),
    ((true, false), Complex64::new(1.0, -1.0)),
];

/// Ideal point for a bit pair.
pub fn map(bits: BitPair) -> Symbol {
    match bits {
        (false, false) => CONSTELLATION[0].1,
        (false, true) => CONSTELLATION[1].1,
        (true, true) => CONSTELLATION[2].1,
        (true, false) => CONSTELLATION[3].1,
    }
}

/// Bit pair whose ideal point is nearest to `symbol`.
pub fn demap(symbol: Symbol) -> BitPair {
    let mut best = CONSTELLATION[0].0;
    let mut best_distance = f64::INFINITY;

    for (bits, point) in CONSTELLATION {
        let distance = (symbol - point).norm_sqr();
        // Strict comparison keeps the first minimum
        if distance < best_distance {
            best = bits;
            best_distance = distance;
        }
    }

    best
}

/// Map a bit vector to symbols, padding it to even length first.
pub fn map_bits(bits: &mut BitVector) -> Vec<Symbol> {
    bits.pad_to_even();
    bits.pairs().map(map).collect()
}

/// Decide every symbol and flatten the pairs back into bits.
pub fn demap_symbols(symbols: &[Symbol]) -> Vec<bool> {
    symbols
        .iter()
        .flat_map(|&symbol| {
            let (hi, lo) = demap(symbol);
            [hi, lo]
        })
        .collect()
}
