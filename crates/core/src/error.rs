//! Error types for the ofdm-sim stack.
//!
//! Most pipeline failures are semantic (wrong content) and never escape the
//! stack as errors: the layer boundary converts them into a corrupted but
//! well-typed payload. The types below are what the individual components
//! report before that conversion happens.

use thiserror::Error;

/// Top-level error type for all operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - Crypto: key handling and authenticated encryption
/// - Framing: strict frame removal
/// - Config: invalid stack or channel parameters
#[derive(Debug, Error)]
pub enum Error {
    /// Key or AEAD failure
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Frame could not be removed in strict mode
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Key management and authenticated-encryption errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Integrity tag did not verify (wrong key, corrupted bytes, or input
    /// that was never ciphertext)
    #[error("authentication failed: ciphertext integrity check did not verify")]
    Authentication,

    /// Plaintext exceeds what the AEAD can seal
    #[error("encryption failed")]
    Encrypt,

    /// Key material could not be parsed
    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

/// Frame removal errors (strict mode only).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// No delimiter anywhere in the frame
    #[error("no delimiter found while removing {tag} frame")]
    MissingDelimiter { tag: &'static str },

    /// Bytes before the delimiter are not the expected tag
    #[error("frame tag mismatch: expected {expected}, got {actual:?}")]
    TagMismatch {
        expected: &'static str,
        actual: Vec<u8>,
    },
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
