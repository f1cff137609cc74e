//! LM-OTS one-time signatures, §4.8. Generic over the Winternitz width
//! (W=4 "slow" or W=2 "fast", selected by `Config::speed_setting`).

use crate::config::Config;
use crate::params::{D_LEAF, D_MESG, D_PBLC, N};
use crate::prf::PrivateKeyGenerator;
use crate::primitives::sha256;

/// Runs one LM-OTS hash chain from iteration `start` up to (but not
/// including) `end`, following the `I || q || i || j || prev` buffer
/// layout.
fn chain(i16: &[u8; 16], q: u32, chain_idx: u16, start: u8, end: u8, mut value: Vec<u8>) -> Vec<u8> {
    for j in start..end {
        let mut buf = Vec::with_capacity(23 + N);
        buf.extend_from_slice(i16);
        buf.extend_from_slice(&q.to_be_bytes());
        buf.extend_from_slice(&chain_idx.to_be_bytes());
        buf.push(j);
        buf.extend_from_slice(&value);
        value = sha256(&buf)[..N].to_vec();
    }
    value
}

fn max_digit(w_bits: u32) -> u32 {
    (1 << w_bits) - 1
}

/// Splits `data` into `count` big-endian `w_bits`-wide digits.
fn extract_digits(data: &[u8], w_bits: u32, count: usize) -> Vec<u32> {
    let mut out = Vec::with_capacity(count);
    let per_byte = 8 / w_bits as usize;
    for idx in 0..count {
        let byte = data[idx / per_byte];
        let shift = 8 - w_bits as usize * (idx % per_byte + 1);
        let digit = (byte >> shift) as u32 & max_digit(w_bits);
        out.push(digit);
    }
    out
}

fn digits_for_message(cfg: &Config) -> usize {
    8 * N / cfg.ots_w() as usize
}

fn digits_for_checksum(cfg: &Config) -> usize {
    cfg.ots_p() - digits_for_message(cfg)
}

fn checksum(digits: &[u32], cfg: &Config) -> u16 {
    let md = max_digit(cfg.ots_w());
    let sum: u32 = digits.iter().map(|d| md - d).sum();
    (sum << cfg.ots_ls()) as u16
}

/// All `p` coefficients (message digits followed by checksum digits) for
/// a signature/verification value `q_hash`.
fn all_digits(q_hash: &[u8], cfg: &Config) -> Vec<u32> {
    let w = cfg.ots_w();
    let mut digits = extract_digits(q_hash, w, digits_for_message(cfg));
    let cksm = checksum(&digits, cfg).to_be_bytes();
    digits.extend(extract_digits(&cksm, w, digits_for_checksum(cfg)));
    digits
}

fn per_leaf_state(q: u32, i: u32) -> [u8; 16] {
    let mut s = [0u8; 16];
    s[0..4].copy_from_slice(&q.to_be_bytes());
    s[4] = i as u8;
    s[7] = i as u8;
    s
}

/// Computes the OTS public key for leaf `q`, given the per-tree PRF and
/// identifier `i16`.
pub fn public_key(prf: &PrivateKeyGenerator, i16: &[u8; 16], q: u32, cfg: &Config) -> Vec<u8> {
    let p = cfg.ots_p();
    let w = cfg.ots_w();
    let md = max_digit(w);
    let mut buf = Vec::with_capacity(21 + p * N);
    buf.extend_from_slice(i16);
    buf.extend_from_slice(&q.to_be_bytes());
    buf.push(D_PBLC);

    for i in 0..p as u32 {
        let x = prf.derive(&per_leaf_state(q, i), N);
        let top = chain(i16, q, i as u16, 0, md as u8, x);
        buf.extend_from_slice(&top);
    }
    sha256(&buf)[..N].to_vec()
}

/// The leaf hash that enters the LMS Merkle tree for OTS public key `pk`
/// at logical leaf `q` (of a tree with `height` levels).
pub fn leaf_hash(i16: &[u8; 16], q: u32, height: u32, pk: &[u8]) -> Vec<u8> {
    let r = q + (1u32 << height);
    let mut buf = Vec::with_capacity(21 + N);
    buf.extend_from_slice(i16);
    buf.extend_from_slice(&r.to_be_bytes());
    buf.push(D_LEAF);
    buf.extend_from_slice(pk);
    sha256(&buf)[..N].to_vec()
}

/// An LM-OTS signature: `(randomizer C, chain values)`.
pub struct OtsSignature {
    pub c: Vec<u8>,
    pub chains: Vec<Vec<u8>>,
}

impl OtsSignature {
    pub fn to_bytes(&self, cfg: &Config) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.c.len() + self.chains.len() * N);
        out.extend_from_slice(&cfg.ots_param_id().to_be_bytes());
        out.extend_from_slice(&self.c);
        for c in &self.chains {
            out.extend_from_slice(c);
        }
        out
    }
}

/// Produces an LM-OTS signature over `message` for leaf `q`.
pub fn sign(
    prf: &PrivateKeyGenerator,
    i16: &[u8; 16],
    q: u32,
    message: &[u8],
    randomizer: Vec<u8>,
    cfg: &Config,
) -> OtsSignature {
    let mut q_input = Vec::with_capacity(21 + N + message.len());
    q_input.extend_from_slice(i16);
    q_input.extend_from_slice(&q.to_be_bytes());
    q_input.push(D_MESG);
    q_input.extend_from_slice(&randomizer);
    q_input.extend_from_slice(message);
    let q_hash = sha256(&q_input);

    let digits = all_digits(&q_hash, cfg);
    let mut chains = Vec::with_capacity(digits.len());
    for (i, &a_i) in digits.iter().enumerate() {
        let x = prf.derive(&per_leaf_state(q, i as u32), N);
        chains.push(chain(i16, q, i as u16, 0, a_i as u8, x));
    }

    OtsSignature {
        c: randomizer,
        chains,
    }
}

/// Recomputes the OTS public key from a signature and message, for
/// verification: walks each chain from its signed value up to the top.
pub fn recover_public_key(
    i16: &[u8; 16],
    q: u32,
    message: &[u8],
    c: &[u8],
    chains: &[Vec<u8>],
    cfg: &Config,
) -> Vec<u8> {
    let mut q_input = Vec::with_capacity(21 + N + message.len());
    q_input.extend_from_slice(i16);
    q_input.extend_from_slice(&q.to_be_bytes());
    q_input.push(D_MESG);
    q_input.extend_from_slice(c);
    q_input.extend_from_slice(message);
    let q_hash = sha256(&q_input);

    let digits = all_digits(&q_hash, cfg);
    let w = cfg.ots_w();
    let md = max_digit(w) as u8;

    let p = cfg.ots_p();
    let mut buf = Vec::with_capacity(21 + p * N);
    buf.extend_from_slice(i16);
    buf.extend_from_slice(&q.to_be_bytes());
    buf.push(D_PBLC);
    for (i, (&a_i, sig_val)) in digits.iter().zip(chains.iter()).enumerate() {
        let top = chain(i16, q, i as u16, a_i as u8, md, sig_val.clone());
        buf.extend_from_slice(&top);
    }
    sha256(&buf)[..N].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, SpeedSetting};

    fn cfg(speed: SpeedSetting) -> Config {
        Config::new(
            speed,
            crate::config::KeygenStrategy::Sha256,
            crate::config::FaultStrategy::None,
            false,
        )
    }

    #[test]
    fn sign_then_recover_matches_public_key_w4() {
        let cfg = cfg(SpeedSetting::Slow);
        let i16 = [7u8; 16];
        let prf = PrivateKeyGenerator::new_sha256(&[1u8; N], &i16);
        let pk = public_key(&prf, &i16, 3, &cfg);
        let sig = sign(&prf, &i16, 3, b"hello", vec![5u8; N], &cfg);
        let recovered = recover_public_key(&i16, 3, b"hello", &sig.c, &sig.chains, &cfg);
        assert_eq!(pk, recovered);
    }

    #[test]
    fn sign_then_recover_matches_public_key_w2() {
        let cfg = cfg(SpeedSetting::Fast);
        let i16 = [9u8; 16];
        let prf = PrivateKeyGenerator::new_sha256(&[2u8; N], &i16);
        let pk = public_key(&prf, &i16, 1, &cfg);
        let sig = sign(&prf, &i16, 1, b"msg", vec![1u8; N], &cfg);
        let recovered = recover_public_key(&i16, 1, b"msg", &sig.c, &sig.chains, &cfg);
        assert_eq!(pk, recovered);
    }

    #[test]
    fn checksum_identity_holds() {
        let cfg = cfg(SpeedSetting::Slow);
        let digits = vec![0u32; digits_for_message(&cfg)];
        let c = checksum(&digits, &cfg);
        let md = max_digit(cfg.ots_w());
        assert_eq!(c as u32, (md * digits_for_message(&cfg) as u32) << cfg.ots_ls());
    }

    #[test]
    fn tampered_signature_does_not_recover_same_key() {
        let cfg = cfg(SpeedSetting::Slow);
        let i16 = [1u8; 16];
        let prf = PrivateKeyGenerator::new_sha256(&[3u8; N], &i16);
        let pk = public_key(&prf, &i16, 0, &cfg);
        let mut sig = sign(&prf, &i16, 0, b"m", vec![2u8; N], &cfg);
        sig.chains[0][0] ^= 0xff;
        let recovered = recover_public_key(&i16, 0, b"m", &sig.c, &sig.chains, &cfg);
        assert_ne!(pk, recovered);
    }
}
