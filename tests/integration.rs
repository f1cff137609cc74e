//! End-to-end keygen -> load -> sign -> verify -> tamper -> rotation flow,
//! per the scenarios this crate is meant to satisfy. Uses a deterministic
//! counting RNG rather than an external test-vector crate.

use sphincs_hybrid::config::{Config, FaultStrategy, KeygenStrategy, SpeedSetting};
use sphincs_hybrid::{keygen, verify, Signer};

fn counting_rand() -> impl FnMut(&mut [u8]) -> bool {
    let mut counter = 0u8;
    move |buf: &mut [u8]| {
        for b in buf.iter_mut() {
            *b = counter;
            counter = counter.wrapping_add(1);
        }
        true
    }
}

#[test]
fn keygen_produces_expected_header_and_sizes() {
    let mut rand = counting_rand();
    let (sk, pk) = keygen(&mut rand).unwrap();

    let sk_bytes = sk.to_bytes();
    let pk_bytes = pk.to_bytes();
    assert_eq!(sk_bytes.len(), 100);
    assert_eq!(pk_bytes.len(), 52);
    assert_eq!(&pk_bytes[0..4], &[0x01, 0x18, 0x00, 0x05]);
    assert_eq!(&pk_bytes[4..28], &sk_bytes[52..76]);
}

#[test]
fn digest_index_is_deterministic_and_in_range() {
    use sphincs_hybrid::tweak::compute_digest_index;
    let zero = [0u8; 24];
    let a = compute_digest_index(&zero, &zero, &zero, b"");
    let b = compute_digest_index(&zero, &zero, &zero, b"");
    assert_eq!(a.idx_tree, b.idx_tree);
    assert_eq!(a.idx_leaf, b.idx_leaf);
    assert_eq!(a.md, b.md);
    assert!(a.idx_leaf < (1u32 << 8));
    for digit in a.md.iter() {
        assert!(u16::from_be_bytes(*digit) < (1u16 << 16));
    }
}

#[test]
#[ignore = "builds a full-size LMS/FORS/hypertree key; seconds to minutes, not a unit-test cost"]
fn full_flow_sign_verify_tamper_and_index_progression() {
    let mut rand = counting_rand();
    let (sk, pk) = keygen(&mut rand).unwrap();
    let cfg = Config::new(SpeedSetting::Slow, KeygenStrategy::Sha256, FaultStrategy::None, false);
    let mut signer = Signer::load(sk, cfg, &mut rand).unwrap();

    let sig1 = signer.sign(b"Hello").unwrap();
    assert_eq!(sig1.len(), 18860);
    assert!(verify(b"Hello", &sig1, &pk));

    let mut tampered = sig1.clone();
    // flip the first byte of the embedded LMS public key's I field.
    let lms_pub_offset = sig1.len() - sphincs_hybrid::params::LEN_SPHINCS_SIG - sphincs_hybrid::params::LEN_LMS_PUBLIC_KEY;
    tampered[lms_pub_offset + 12] ^= 0xff;
    assert!(!verify(b"Hello", &tampered, &pk));

    let sig2 = signer.sign(b"Hello").unwrap();
    assert_eq!(&sig1[4..8], &0u32.to_be_bytes());
    assert_eq!(&sig2[4..8], &1u32.to_be_bytes());
    assert!(verify(b"Hello", &sig2, &pk));
}

#[test]
#[ignore = "signs through a full LMS tree's worth of messages to exercise rotation"]
fn rotation_keeps_signatures_verifiable() {
    let mut rand = counting_rand();
    let (sk, pk) = keygen(&mut rand).unwrap();
    let cfg = Config::new(SpeedSetting::Fast, KeygenStrategy::Aes256, FaultStrategy::None, false);
    let mut signer = Signer::load(sk, cfg, &mut rand).unwrap();

    for i in 0..200u32 {
        let msg = format!("message {}", i);
        let sig = signer.sign(msg.as_bytes()).unwrap();
        assert!(verify(msg.as_bytes(), &sig, &pk));
    }
}
