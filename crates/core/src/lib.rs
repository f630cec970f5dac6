//! ofdm-sim-core: Educational seven-layer stack with an OFDM physical layer
//!
//! This library provides the core components for a learning-focused system that:
//! - Encrypts a message with a shared key (authenticated encryption)
//! - Wraps it in session, transport, network and link frames
//! - Maps the bits onto a QPSK constellation and modulates OFDM blocks
//! - Adds Gaussian channel noise with seeded randomness
//! - Demodulates and unwraps everything back to text
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `bitio`: Byte/bit conversion and parity padding
//! - `crypto`: Shared key and XChaCha20-Poly1305
//! - `framing`: Tagged delimiter frames
//! - `mapper`: QPSK constellation and nearest-point decisions
//! - `modem`: Per-block inverse/forward DFT
//! - `channel`: Additive Gaussian noise
//! - `stack`: One endpoint, one operation per layer
//! - `metrics`: Observable error rates
//!
//! # Design Principles
//!
//! - **No panics**: Pipeline failures become visibly corrupted payloads
//! - **Owned values**: Each stage consumes its input and returns a new value
//! - **Deterministic**: Seeded channel noise makes runs reproducible
//! - **Observable**: Bit and symbol error counts against ground truth
//!
//! # Example
//!
//! ```
//! use ofdm_sim_core::stack::{ProtocolStack, StackConfig};
//!
//! let mut alice = ProtocolStack::new(None, StackConfig::noiseless(42)).unwrap();
//! let bob = ProtocolStack::new(Some(alice.key().clone()), StackConfig::noiseless(42)).unwrap();
//!
//! let signal = alice.send("Hello Bob!");
//! assert_eq!(bob.receive(signal), "Hello Bob!");
//! ```

pub mod bitio;
pub mod channel;
pub mod crypto;
pub mod error;
pub mod framing;
pub mod mapper;
pub mod metrics;
pub mod modem;
pub mod stack;

// Re-export commonly used types
pub use crypto::SharedKey;
pub use error::{Error, Result};
pub use stack::{Layer, Payload, PhysicalPayload, ProtocolStack, StackConfig};
