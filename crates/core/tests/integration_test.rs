//! Integration tests for the full seven-layer pipeline.
//!
//! These tests verify end-to-end behavior: text -> encrypt -> frame ->
//! QPSK -> OFDM -> channel -> demodulate -> unframe -> decrypt -> text, with
//! and without noise.

use ofdm_sim_core::{
    bitio::BitVector,
    framing::{self, FrameTag},
    mapper,
    metrics::Metrics,
    modem::{BlockModem, DEFAULT_BLOCK_SIZE},
    stack::{Layer, Payload, ProtocolStack, StackConfig, CORRUPTED_MARKER},
};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn endpoints(config: StackConfig) -> (ProtocolStack, ProtocolStack) {
    let alice = ProtocolStack::new(None, config).expect("sender config");
    let bob = ProtocolStack::new(Some(alice.key().clone()), config).expect("receiver config");
    (alice, bob)
}

fn random_bits(rng: &mut ChaCha8Rng, len: usize) -> BitVector {
    BitVector::from_bits((0..len).map(|_| rng.gen()).collect())
}

/// The walkthrough from the demo: every layer in order, noiseless.
#[test]
fn test_hello_bob_layer_by_layer() {
    let (mut alice, bob) = endpoints(StackConfig::noiseless(42));

    let mut trace = Vec::new();
    let mut payload = Payload::Text("Hello Bob!".to_string());
    for layer in Layer::SEND_ORDER {
        payload = alice.encode_step(layer, payload);
        trace.push((layer, payload.clone()));
    }

    // L5 output is the session tag followed by the L6 ciphertext
    let (_, Payload::Bytes(l6)) = &trace[1] else {
        panic!("L6 should produce bytes");
    };
    let (_, Payload::Bytes(l5)) = &trace[2] else {
        panic!("L5 should produce bytes");
    };
    assert!(l5.starts_with(b"SESSION|"));
    assert_eq!(&l5[8..], &l6[..]);

    let mut payload = payload;
    for layer in Layer::RECEIVE_ORDER {
        payload = bob.decode_step(layer, payload);
    }
    assert_eq!(payload.into_text(), "Hello Bob!");
}

#[test]
fn test_default_noise_round_trip() {
    let config = StackConfig {
        seed: Some(2024),
        ..StackConfig::default()
    };
    let (mut alice, bob) = endpoints(config);

    let long = "x".repeat(300);
    let messages = ["Hello Bob! OFDM is cool.", "", "ünïcödé ✓", long.as_str()];

    let mut metrics = Metrics::new();
    for msg in messages {
        let signal = alice.send(msg);
        metrics.record_physical(&signal);
        let received = bob.receive(signal);
        metrics.record_delivery(msg, &received);
    }

    assert_eq!(metrics.bit_errors, 0);
    assert_eq!(metrics.messages_intact, 4);
}

#[test]
fn test_wrong_key_corrupts_message() {
    let config = StackConfig::noiseless(7);
    let mut alice = ProtocolStack::new(None, config).unwrap();
    let mallory = ProtocolStack::new(None, config).unwrap();

    let signal = alice.send("Hello Bob!");
    assert_eq!(signal.bit_errors, 0);

    let session = mallory.l5_remove(
        &mallory.l4_remove(&mallory.l3_remove(&mallory.l2_remove(&signal.data))),
    );
    assert!(mallory.l6_decrypt_checked(&session).is_err());
    let l6 = mallory.l6_decrypt(&session);
    assert!(l6.starts_with(CORRUPTED_MARKER));

    let received = mallory.receive(signal);
    assert_ne!(received, "Hello Bob!");
}

#[test]
fn test_heavy_noise_corrupts_message() {
    let config = StackConfig {
        noise_std: 1.0,
        seed: Some(13),
        ..StackConfig::default()
    };
    let (mut alice, bob) = endpoints(config);

    let signal = alice.send("Hello Bob!");
    assert!(signal.bit_errors > 0);
    assert!(signal.symbol_errors > 0);

    // Nothing panics; the damage only shows in the final text
    let received = bob.receive(signal);
    assert_ne!(received, "Hello Bob!");
}

#[test]
fn test_odd_bit_count_padded_once() {
    let config = StackConfig::noiseless(5);
    let mut stack = ProtocolStack::new(None, config).unwrap();

    let bits = BitVector::from_bits(vec![true, false, true, true, false]);
    let mut padded = bits.clone();
    assert!(padded.pad_to_even());
    assert_eq!(padded.len(), bits.len() + 1);

    let (recovered, constellation) = stack.transmit_bits(bits.clone());
    assert_eq!(constellation.len(), 3);
    assert_eq!(recovered, bits);
    assert_eq!(recovered.len(), 5);
}

#[test]
fn test_bit_length_invariant() {
    let modem = BlockModem::new(DEFAULT_BLOCK_SIZE).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    for byte_len in [1usize, 7, 15, 16, 17, 100, 333] {
        let bytes: Vec<u8> = (0..byte_len).map(|_| rng.gen()).collect();
        let mut bits = BitVector::from_bytes(&bytes);
        let original_len = bits.original_len();

        let symbols = mapper::map_bits(&mut bits);
        let estimates = modem.demodulate(&modem.modulate(&symbols));

        // Before truncation: whole blocks, two bits per subcarrier
        let raw_bits = mapper::demap_symbols(&estimates);
        assert_eq!(raw_bits.len() % (2 * DEFAULT_BLOCK_SIZE), 0);
        assert!(raw_bits.len() >= original_len);

        let recovered = BitVector::recovered(raw_bits, original_len);
        assert_eq!(recovered.len(), original_len);
        assert_eq!(recovered.to_bytes(), bytes);
    }
}

#[test]
fn test_noisy_path_is_deterministic() {
    let config = StackConfig {
        noise_std: 0.15,
        seed: Some(31337),
        ..StackConfig::default()
    };
    let mut a = ProtocolStack::new(None, config).unwrap();
    let mut b = ProtocolStack::new(None, config).unwrap();

    let frame = framing::add(FrameTag::Link, b"identical input bytes for both endpoints");
    let first = a.l1_modulate(&frame);
    let second = b.l1_modulate(&frame);

    assert_eq!(first, second);
    assert!(first.bit_errors > 0);
}

#[test]
fn test_bit_error_rate_grows_with_noise() {
    let levels = [0.0, 0.05, 0.1, 0.2, 0.4];
    let mut rng = ChaCha8Rng::seed_from_u64(2718);
    let mut rates = Vec::new();

    for noise_std in levels {
        let config = StackConfig {
            noise_std,
            seed: Some(99),
            ..StackConfig::default()
        };
        let mut stack = ProtocolStack::new(None, config).unwrap();

        let mut errors = 0;
        let mut total = 0;
        for _ in 0..20 {
            let bits = random_bits(&mut rng, 512);
            let (recovered, _) = stack.transmit_bits(bits.clone());
            errors += bits.count_differences(&recovered);
            total += bits.len();
        }
        rates.push(errors as f64 / total as f64);
    }

    assert_eq!(rates[0], 0.0);
    for pair in rates.windows(2) {
        assert!(
            pair[1] + 0.01 >= pair[0],
            "BER should not drop as noise grows: {rates:?}"
        );
    }
    assert!(rates[4] > 0.3, "heavy noise should approach coin flips: {rates:?}");
}

#[test]
fn test_endpoints_on_separate_threads() {
    let config = StackConfig::noiseless(17);
    let (mut alice, bob) = endpoints(config);

    let signal = std::thread::spawn(move || alice.send("across threads"))
        .join()
        .unwrap();
    let received = std::thread::spawn(move || bob.receive(signal)).join().unwrap();

    assert_eq!(received, "across threads");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_noiseless_round_trip(msg in "\\PC{0,200}") {
        let (mut alice, bob) = endpoints(StackConfig::noiseless(1));
        let signal = alice.send(&msg);
        prop_assert_eq!(signal.bit_errors, 0);
        prop_assert_eq!(bob.receive(signal), msg);
    }

    #[test]
    fn prop_frame_round_trip(payload in proptest::collection::vec(any::<u8>(), 0..256)) {
        for tag in FrameTag::ALL {
            let framed = framing::add(tag, &payload);
            prop_assert_eq!(framing::remove(tag, &framed), payload.clone());
        }
    }

    #[test]
    fn prop_noiseless_bits_survive(len in 0usize..600, seed in any::<u64>()) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let bits = random_bits(&mut rng, len);
        let mut stack = ProtocolStack::new(None, StackConfig::noiseless(seed)).unwrap();

        let (recovered, constellation) = stack.transmit_bits(bits.clone());
        prop_assert_eq!(constellation.len(), len.div_ceil(2));
        prop_assert_eq!(recovered, bits);
    }
}
