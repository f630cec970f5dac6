//! Seven-layer protocol stack for one endpoint.
//!
//! The sender walks the layers top-down, the receiver bottom-up:
//!
//! ```text
//! L7 Application   text  <-> bytes
//! L6 Presentation  XChaCha20-Poly1305 encrypt / decrypt
//! L5 Session       SESSION| frame
//! L4 Transport     TCP|     frame
//! L3 Network       IP|      frame
//! L2 Data Link     MAC|     frame
//! L1 Physical      bits -> QPSK -> IDFT -> noise -> DFT -> bits
//! ```
//!
//! L1 is a single atomic round trip: the payload it returns already holds
//! what the receiver demodulated, so there is no separate receive call for
//! the physical layer.
//!
//! # Failure Model
//!
//! Nothing here returns an error once the stack is built. A failed
//! decryption becomes `CORRUPTED_MARKER` followed by the offending bytes, a
//! frame without a delimiter passes through unchanged, and undecodable text
//! is dropped. Corruption keeps flowing up and shows in the final message.
//! Callers that need to know whether decryption failed use
//! `l6_decrypt_checked`; the marker alone cannot tell a failure from a
//! plaintext that happens to start with it.
//!
//! The sender's pre-padding bit length is side information that never
//! crosses the channel; `l1_modulate` uses it to truncate the demodulated
//! bits.

use crate::bitio::BitVector;
use crate::channel::{ChannelConfig, ChannelModel, DEFAULT_NOISE_STD};
use crate::crypto::{KeyManager, SharedKey};
use crate::error::{CryptoError, Error, Result};
use crate::framing::{self, FrameTag};
use crate::mapper::{self, Symbol};
use crate::modem::{BlockModem, DEFAULT_BLOCK_SIZE};

/// Prefix of the payload L6 produces when decryption fails.
pub const CORRUPTED_MARKER: &[u8] = b"[DECRYPTION FAILED] ";

/// Prefix of the payload a strict frame removal produces on failure.
pub const FRAMING_ERROR_MARKER: &[u8] = b"[FRAMING ERROR] ";

/// Tunables for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackConfig {
    /// Subcarriers per OFDM block
    pub block_size: usize,

    /// Channel noise standard deviation per real dimension
    pub noise_std: f64,

    /// Channel RNG seed (None = OS entropy)
    pub seed: Option<u64>,

    /// Verify tags on frame removal and mark failures instead of passing
    /// the input through silently
    pub strict_framing: bool,
}

impl StackConfig {
    /// Default block size with a perfect channel.
    pub fn noiseless(seed: u64) -> Self {
        Self {
            noise_std: 0.0,
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Check block size and noise level.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::Config("block_size must be at least 1".to_string()));
        }
        self.channel_config().validate()
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            noise_std: self.noise_std,
            seed: self.seed,
        }
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            noise_std: DEFAULT_NOISE_STD,
            seed: None,
            strict_framing: false,
        }
    }
}

/// OSI layer, numbered as in the reference model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    Physical = 1,
    DataLink = 2,
    Network = 3,
    Transport = 4,
    Session = 5,
    Presentation = 6,
    Application = 7,
}

impl Layer {
    /// Sender order, L7 down to L1.
    pub const SEND_ORDER: [Layer; 7] = [
        Layer::Application,
        Layer::Presentation,
        Layer::Session,
        Layer::Transport,
        Layer::Network,
        Layer::DataLink,
        Layer::Physical,
    ];

    /// Receiver order, L1 up to L7.
    pub const RECEIVE_ORDER: [Layer; 7] = [
        Layer::Physical,
        Layer::DataLink,
        Layer::Network,
        Layer::Transport,
        Layer::Session,
        Layer::Presentation,
        Layer::Application,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Layer::Physical => "Physical",
            Layer::DataLink => "Data Link",
            Layer::Network => "Network",
            Layer::Transport => "Transport",
            Layer::Session => "Session",
            Layer::Presentation => "Presentation",
            Layer::Application => "Application",
        }
    }

    /// Frame tag for the four framing layers.
    pub fn frame_tag(self) -> Option<FrameTag> {
        match self {
            Layer::Session => Some(FrameTag::Session),
            Layer::Transport => Some(FrameTag::Transport),
            Layer::Network => Some(FrameTag::Network),
            Layer::DataLink => Some(FrameTag::Link),
            Layer::Physical | Layer::Presentation | Layer::Application => None,
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{} {}", self.number(), self.name())
    }
}

/// Result of the L1 round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalPayload {
    /// Received symbol estimates for the payload symbols (block padding removed)
    pub constellation: Vec<Symbol>,

    /// Bytes the receiver recovered
    pub data: Vec<u8>,

    /// Bits before parity padding
    pub bit_len: usize,

    /// Bits after parity padding (what the mapper consumed)
    pub padded_bit_len: usize,

    /// OFDM blocks on the wire
    pub blocks: usize,

    /// Recovered bits that differ from the sent bits
    pub bit_errors: usize,

    /// Symbols decided as a different constellation point
    pub symbol_errors: usize,
}

/// Value handed from one layer step to the next.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Bytes(Vec<u8>),
    Signal(PhysicalPayload),
}

impl Payload {
    /// Bytes view: text as UTF-8, a signal as its recovered data.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Payload::Text(text) => text.into_bytes(),
            Payload::Bytes(bytes) => bytes,
            Payload::Signal(signal) => signal.data,
        }
    }

    /// Text view, dropping invalid UTF-8.
    pub fn into_text(self) -> String {
        match self {
            Payload::Text(text) => text,
            other => decode_text(&other.into_bytes()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Text(text) => text.len(),
            Payload::Bytes(bytes) => bytes.len(),
            Payload::Signal(signal) => signal.data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Best-effort UTF-8 decode: invalid sequences are dropped.
pub fn decode_text(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

/// The payload L6 hands up when `data` could not be decrypted.
pub fn mark_corrupted(data: &[u8]) -> Vec<u8> {
    marked(CORRUPTED_MARKER, data)
}

fn marked(marker: &[u8], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(marker.len() + data.len());
    out.extend_from_slice(marker);
    out.extend_from_slice(data);
    out
}

/// One endpoint of the simulated link.
#[derive(Debug)]
pub struct ProtocolStack {
    config: StackConfig,
    keys: KeyManager,
    modem: BlockModem,
    channel: ChannelModel,
}

impl ProtocolStack {
    /// Build an endpoint. Without a key a fresh one is generated; read it
    /// back with `key()` to construct the peer.
    ///
    /// # Errors
    /// `Error::Config` if `config` is invalid.
    pub fn new(key: Option<SharedKey>, config: StackConfig) -> Result<Self> {
        config.validate()?;

        let keys = match key {
            Some(key) => KeyManager::new(key),
            None => KeyManager::generate(),
        };

        Ok(Self {
            config,
            keys,
            modem: BlockModem::new(config.block_size)?,
            channel: ChannelModel::new(config.channel_config())?,
        })
    }

    pub fn key(&self) -> &SharedKey {
        self.keys.key()
    }

    pub fn channel(&self) -> &ChannelModel {
        &self.channel
    }

    // ---------- Encode (sender) ----------

    /// L7: text to bytes.
    pub fn l7(&self, msg: &str) -> Vec<u8> {
        tracing::debug!(layer = 7, len = msg.len(), "application encode");
        msg.as_bytes().to_vec()
    }

    /// L6: authenticated encryption.
    pub fn l6_encrypt(&self, data: &[u8]) -> Vec<u8> {
        match self.keys.encrypt(data) {
            Ok(ciphertext) => {
                tracing::debug!(layer = 6, len = ciphertext.len(), "encrypted");
                ciphertext
            }
            Err(e) => {
                tracing::error!(layer = 6, error = %e, "encryption failed");
                mark_corrupted(data)
            }
        }
    }

    /// L5: session frame.
    pub fn l5(&self, data: &[u8]) -> Vec<u8> {
        self.frame(Layer::Session, data)
    }

    /// L4: transport frame.
    pub fn l4(&self, data: &[u8]) -> Vec<u8> {
        self.frame(Layer::Transport, data)
    }

    /// L3: network frame.
    pub fn l3(&self, data: &[u8]) -> Vec<u8> {
        self.frame(Layer::Network, data)
    }

    /// L2: link frame.
    pub fn l2(&self, data: &[u8]) -> Vec<u8> {
        self.frame(Layer::DataLink, data)
    }

    /// L1: modulate, cross the channel, and demodulate in one step.
    pub fn l1_modulate(&mut self, data: &[u8]) -> PhysicalPayload {
        let mut sent = BitVector::from_bytes(data);
        let bit_len = sent.len();

        // `sent` comes back padded to what the mapper consumed
        let (recovered, constellation) = self.transmit(&mut sent);
        let padded_bit_len = sent.len();

        let symbol_errors = sent
            .pairs()
            .zip(&constellation)
            .filter(|&(bits, &symbol)| mapper::demap(symbol) != bits)
            .count();

        sent.strip_padding();
        let bit_errors = sent.count_differences(&recovered);
        let blocks = self.modem.block_count(constellation.len());

        tracing::debug!(
            layer = 1,
            bits = bit_len,
            symbols = constellation.len(),
            blocks,
            bit_errors,
            "physical round trip"
        );

        PhysicalPayload {
            data: recovered.to_bytes(),
            constellation,
            bit_len,
            padded_bit_len,
            blocks,
            bit_errors,
            symbol_errors,
        }
    }

    /// Push raw bits through mapper, modem and channel.
    ///
    /// Returns the recovered bits, truncated to the input's original length,
    /// and the received symbol estimates with block padding removed.
    pub fn transmit_bits(&mut self, mut bits: BitVector) -> (BitVector, Vec<Symbol>) {
        self.transmit(&mut bits)
    }

    /// Like `transmit_bits`, leaving `bits` padded to even length.
    fn transmit(&mut self, bits: &mut BitVector) -> (BitVector, Vec<Symbol>) {
        let original_len = bits.original_len();
        let symbols = mapper::map_bits(bits);

        let signal = self.modem.modulate(&symbols);
        let received = self.channel.apply(signal);

        let mut estimates = self.modem.demodulate(&received);
        estimates.truncate(symbols.len());

        let recovered = BitVector::recovered(mapper::demap_symbols(&estimates), original_len);
        (recovered, estimates)
    }

    // ---------- Decode (receiver) ----------

    /// L2: strip link frame.
    pub fn l2_remove(&self, data: &[u8]) -> Vec<u8> {
        self.unframe(Layer::DataLink, data)
    }

    /// L3: strip network frame.
    pub fn l3_remove(&self, data: &[u8]) -> Vec<u8> {
        self.unframe(Layer::Network, data)
    }

    /// L4: strip transport frame.
    pub fn l4_remove(&self, data: &[u8]) -> Vec<u8> {
        self.unframe(Layer::Transport, data)
    }

    /// L5: strip session frame.
    pub fn l5_remove(&self, data: &[u8]) -> Vec<u8> {
        self.unframe(Layer::Session, data)
    }

    /// L6: decrypt, or mark the payload as corrupted.
    pub fn l6_decrypt(&self, data: &[u8]) -> Vec<u8> {
        self.l6_decrypt_checked(data).unwrap_or_else(|_| mark_corrupted(data))
    }

    /// L6 with the failure reported instead of folded into the payload.
    ///
    /// # Errors
    /// `CryptoError::Authentication` for a wrong key or damaged ciphertext.
    pub fn l6_decrypt_checked(&self, data: &[u8]) -> std::result::Result<Vec<u8>, CryptoError> {
        match self.keys.decrypt(data) {
            Ok(plaintext) => {
                tracing::debug!(layer = 6, len = plaintext.len(), "decrypted");
                Ok(plaintext)
            }
            Err(e) => {
                tracing::warn!(layer = 6, len = data.len(), error = %e, "decryption failed");
                Err(e)
            }
        }
    }

    /// L7: bytes to text, dropping invalid UTF-8.
    pub fn l7_decode(&self, data: &[u8]) -> String {
        let text = decode_text(data);
        if text.len() != data.len() {
            tracing::debug!(
                layer = 7,
                dropped = data.len() - text.len(),
                "invalid UTF-8 dropped"
            );
        }
        text
    }

    // ---------- Layer dispatch ----------

    /// Run one sender step.
    pub fn encode_step(&mut self, layer: Layer, input: Payload) -> Payload {
        match layer {
            Layer::Application => Payload::Bytes(self.l7(&input.into_text())),
            Layer::Presentation => Payload::Bytes(self.l6_encrypt(&input.into_bytes())),
            Layer::Session => Payload::Bytes(self.l5(&input.into_bytes())),
            Layer::Transport => Payload::Bytes(self.l4(&input.into_bytes())),
            Layer::Network => Payload::Bytes(self.l3(&input.into_bytes())),
            Layer::DataLink => Payload::Bytes(self.l2(&input.into_bytes())),
            Layer::Physical => Payload::Signal(self.l1_modulate(&input.into_bytes())),
        }
    }

    /// Run one receiver step.
    pub fn decode_step(&self, layer: Layer, input: Payload) -> Payload {
        match layer {
            Layer::Physical => Payload::Bytes(input.into_bytes()),
            Layer::DataLink => Payload::Bytes(self.l2_remove(&input.into_bytes())),
            Layer::Network => Payload::Bytes(self.l3_remove(&input.into_bytes())),
            Layer::Transport => Payload::Bytes(self.l4_remove(&input.into_bytes())),
            Layer::Session => Payload::Bytes(self.l5_remove(&input.into_bytes())),
            Layer::Presentation => Payload::Bytes(self.l6_decrypt(&input.into_bytes())),
            Layer::Application => Payload::Text(self.l7_decode(&input.into_bytes())),
        }
    }

    /// Run every sender layer, L7 to L1.
    pub fn send(&mut self, msg: &str) -> PhysicalPayload {
        let app = self.l7(msg);
        let framed = self.l2(&self.l3(&self.l4(&self.l5(&self.l6_encrypt(&app)))));
        self.l1_modulate(&framed)
    }

    /// Run every receiver layer, L1 to L7.
    pub fn receive(&self, signal: PhysicalPayload) -> String {
        Layer::RECEIVE_ORDER
            .iter()
            .fold(Payload::Signal(signal), |payload, &layer| {
                self.decode_step(layer, payload)
            })
            .into_text()
    }

    fn frame(&self, layer: Layer, data: &[u8]) -> Vec<u8> {
        // Only the four framing layers call in here
        let Some(tag) = layer.frame_tag() else {
            return data.to_vec();
        };
        let framed = framing::add(tag, data);
        tracing::debug!(layer = layer.number(), tag = tag.as_str(), len = framed.len(), "framed");
        framed
    }

    fn unframe(&self, layer: Layer, data: &[u8]) -> Vec<u8> {
        let Some(tag) = layer.frame_tag() else {
            return data.to_vec();
        };
        if !self.config.strict_framing {
            return framing::remove(tag, data);
        }

        match framing::remove_strict(tag, data) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(layer = layer.number(), error = %e, "strict frame removal failed");
                marked(FRAMING_ERROR_MARKER, data)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(config: StackConfig) -> (ProtocolStack, ProtocolStack) {
        let alice = ProtocolStack::new(None, config).unwrap();
        let bob = ProtocolStack::new(Some(alice.key().clone()), config).unwrap();
        (alice, bob)
    }

    #[test]
    fn test_hello_bob_noiseless() {
        let (mut alice, bob) = pair(StackConfig::noiseless(1));

        let l7 = alice.l7("Hello Bob!");
        let l6 = alice.l6_encrypt(&l7);
        let l5 = alice.l5(&l6);
        assert!(l5.starts_with(b"SESSION|"));
        assert_eq!(&l5[b"SESSION|".len()..], &l6[..]);

        let l4 = alice.l4(&l5);
        let l3 = alice.l3(&l4);
        let l2 = alice.l2(&l3);
        assert!(l2.starts_with(b"MAC|IP|TCP|SESSION|"));

        let phy = alice.l1_modulate(&l2);
        assert_eq!(phy.data, l2);
        assert_eq!(phy.bit_errors, 0);
        assert_eq!(phy.symbol_errors, 0);
        assert_eq!(phy.bit_len, l2.len() * 8);
        assert_eq!(phy.padded_bit_len, phy.bit_len);
        assert_eq!(phy.constellation.len(), phy.bit_len / 2);

        let r = bob.l2_remove(&phy.data);
        let r = bob.l3_remove(&r);
        let r = bob.l4_remove(&r);
        let r = bob.l5_remove(&r);
        assert_eq!(r, l6);
        let r = bob.l6_decrypt(&r);
        assert_eq!(bob.l7_decode(&r), "Hello Bob!");
    }

    #[test]
    fn test_generated_key_exposed() {
        let alice = ProtocolStack::new(None, StackConfig::default()).unwrap();
        let bob = ProtocolStack::new(Some(alice.key().clone()), StackConfig::default()).unwrap();
        assert_eq!(alice.key(), bob.key());

        let other = ProtocolStack::new(None, StackConfig::default()).unwrap();
        assert_ne!(alice.key(), other.key());
    }

    #[test]
    fn test_wrong_key_marks_payload() {
        let mut alice = ProtocolStack::new(None, StackConfig::noiseless(2)).unwrap();
        let eve = ProtocolStack::new(None, StackConfig::noiseless(2)).unwrap();

        let phy = alice.send("Hello Bob!");
        let session = eve.l5_remove(&eve.l4_remove(&eve.l3_remove(&eve.l2_remove(&phy.data))));
        assert_eq!(
            eve.l6_decrypt_checked(&session),
            Err(CryptoError::Authentication)
        );
        let l6 = eve.l6_decrypt(&session);
        assert_eq!(l6, mark_corrupted(&session));
        assert_eq!(&l6[CORRUPTED_MARKER.len()..], &session[..]);

        let text = eve.l7_decode(&l6);
        assert!(text.starts_with("[DECRYPTION FAILED] "));
        assert_ne!(text, "Hello Bob!");
    }

    #[test]
    fn test_marker_lookalike_plaintext_decrypts() {
        let (mut alice, bob) = pair(StackConfig::noiseless(8));
        let msg = "[DECRYPTION FAILED] hi";

        let phy = alice.send(msg);
        let session = bob.l5_remove(&bob.l4_remove(&bob.l3_remove(&bob.l2_remove(&phy.data))));

        // Decrypts fine even though the plaintext starts with the marker
        assert_eq!(bob.l6_decrypt_checked(&session), Ok(msg.as_bytes().to_vec()));
        assert_eq!(bob.l6_decrypt(&session), msg.as_bytes());
    }

    #[test]
    fn test_frames_follow_layer_tags() {
        let stack = ProtocolStack::new(None, StackConfig::noiseless(9)).unwrap();
        let framed = [
            (Layer::Session, stack.l5(b"p")),
            (Layer::Transport, stack.l4(b"p")),
            (Layer::Network, stack.l3(b"p")),
            (Layer::DataLink, stack.l2(b"p")),
        ];
        for (layer, frame) in framed {
            let tag = layer.frame_tag().unwrap();
            assert_eq!(frame, framing::add(tag, b"p"));
        }
        assert_eq!(stack.l3_remove(b"IP|p"), b"p".to_vec());
    }

    #[test]
    fn test_empty_message() {
        let (mut alice, bob) = pair(StackConfig::noiseless(3));
        let phy = alice.send("");
        assert_eq!(bob.receive(phy), "");
    }

    #[test]
    fn test_dispatch_matches_direct_calls() {
        let (mut alice, bob) = pair(StackConfig::noiseless(4));

        let mut payload = Payload::Text("layer by layer".to_string());
        for layer in Layer::SEND_ORDER {
            payload = alice.encode_step(layer, payload);
        }
        let Payload::Signal(signal) = payload else {
            panic!("physical layer must produce a signal");
        };

        let mut payload = Payload::Signal(signal);
        for layer in Layer::RECEIVE_ORDER {
            payload = bob.decode_step(layer, payload);
        }
        assert_eq!(payload, Payload::Text("layer by layer".to_string()));
    }

    #[test]
    fn test_layer_numbering() {
        let numbers: Vec<u8> = Layer::SEND_ORDER.iter().map(|l| l.number()).collect();
        assert_eq!(numbers, vec![7, 6, 5, 4, 3, 2, 1]);

        let mut reversed = Layer::SEND_ORDER;
        reversed.reverse();
        assert_eq!(reversed, Layer::RECEIVE_ORDER);

        assert_eq!(Layer::DataLink.frame_tag(), Some(FrameTag::Link));
        assert_eq!(Layer::Presentation.frame_tag(), None);
        assert_eq!(Layer::Session.to_string(), "L5 Session");
    }

    #[test]
    fn test_missing_delimiter_passes_through() {
        let stack = ProtocolStack::new(None, StackConfig::noiseless(5)).unwrap();
        // Lenient default: corruption is carried forward, not reported
        assert_eq!(stack.l2_remove(b"garbled"), b"garbled".to_vec());
    }

    #[test]
    fn test_strict_framing_marks_failure() {
        let config = StackConfig {
            strict_framing: true,
            ..StackConfig::noiseless(6)
        };
        let stack = ProtocolStack::new(None, config).unwrap();

        assert_eq!(stack.l2_remove(b"MAC|ok"), b"ok".to_vec());

        let out = stack.l2_remove(b"IP|wrong layer");
        assert!(out.starts_with(FRAMING_ERROR_MARKER));
        assert!(out.ends_with(b"IP|wrong layer"));
    }

    #[test]
    fn test_invalid_utf8_dropped() {
        assert_eq!(decode_text(b"ok\xFF\xFEyes"), "okyes");
        assert_eq!(decode_text(b"\xE2\x82"), "");
        assert_eq!(decode_text("héllo".as_bytes()), "héllo");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let zero_block = StackConfig {
            block_size: 0,
            ..StackConfig::default()
        };
        assert!(matches!(
            ProtocolStack::new(None, zero_block),
            Err(Error::Config(_))
        ));

        let negative_noise = StackConfig {
            noise_std: -1.0,
            ..StackConfig::default()
        };
        assert!(ProtocolStack::new(None, negative_noise).is_err());
    }

    #[test]
    fn test_payload_conversions() {
        assert_eq!(Payload::Text("ab".into()).into_bytes(), b"ab".to_vec());
        assert_eq!(Payload::Bytes(vec![0x68, 0x69]).into_text(), "hi");
        assert!(Payload::Bytes(Vec::new()).is_empty());
    }
}
