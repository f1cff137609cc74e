//! HMAC-DRBG (NIST SP 800-90A), self-test-less variant, keyed by a
//! 48-byte seed (32 bytes entropy + 16 bytes nonce) drawn once from the
//! system randomness source at signer load.

use hmac::{Hmac, Mac, NewMac};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Caller-supplied randomness source: fills `buffer`, returns `false` on
/// failure (matches the legacy `bool (*do_rand)(void*, size_t)` callback).
pub type RandFn<'a> = &'a mut dyn FnMut(&mut [u8]) -> bool;

const RESEED_LIMIT: u64 = 1 << 48;

#[derive(Zeroize)]
#[zeroize(drop)]
pub struct HmacDrbg {
    key: [u8; 32],
    v: [u8; 32],
    reseed_counter: u64,
}

impl HmacDrbg {
    pub fn new(seed: &[u8; 48]) -> Self {
        let mut drbg = HmacDrbg {
            key: [0u8; 32],
            v: [1u8; 32],
            reseed_counter: 1,
        };
        drbg.update(Some(seed));
        drbg
    }

    /// Seeds a fresh DRBG by pulling 48 bytes from `do_rand`.
    pub fn seed(do_rand: RandFn) -> Result<Self> {
        let mut seed = [0u8; 48];
        if !do_rand(&mut seed) {
            return Err(Error::Entropy);
        }
        let drbg = Self::new(&seed);
        seed.zeroize();
        Ok(drbg)
    }

    fn mac(key: &[u8; 32], data: &[&[u8]]) -> [u8; 32] {
        let mut m = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
        for d in data {
            m.update(d);
        }
        let out = m.finalize().into_bytes();
        let mut r = [0u8; 32];
        r.copy_from_slice(&out);
        r
    }

    fn update(&mut self, provided: Option<&[u8]>) {
        let data: &[u8] = provided.unwrap_or(&[]);
        self.key = Self::mac(&self.key, &[&self.v, &[0x00], data]);
        self.v = Self::mac(&self.key, &[&self.v]);
        if provided.is_some() {
            self.key = Self::mac(&self.key, &[&self.v, &[0x01], data]);
            self.v = Self::mac(&self.key, &[&self.v]);
        }
    }

    /// Draws `out.len()` bytes of DRBG output.
    pub fn generate(&mut self, out: &mut [u8]) -> Result<()> {
        if self.reseed_counter > RESEED_LIMIT {
            return Err(Error::DrbgExhausted);
        }
        let mut filled = 0;
        while filled < out.len() {
            self.v = Self::mac(&self.key, &[&self.v]);
            let n = (out.len() - filled).min(32);
            out[filled..filled + n].copy_from_slice(&self.v[..n]);
            filled += n;
        }
        self.update(None);
        self.reseed_counter += 1;
        Ok(())
    }
}

/// HMAC-SHA256(key, data parts concatenated), truncated to `n` bytes.
/// Used to derive the per-rotation SPHINCS+ randomizer from `sk_prf`
/// rather than taking DRBG output directly.
pub fn hmac_sha256(key: &[u8], data: &[&[u8]], n: usize) -> Vec<u8> {
    let mut m = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    for d in data {
        m.update(d);
    }
    let out = m.finalize().into_bytes();
    out[..n].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_sha256_is_deterministic_and_key_sensitive() {
        let data: &[&[u8]] = &[b"drbg-bytes", b"lms-pub-key"];
        let a = hmac_sha256(b"key-a", data, 24);
        let b = hmac_sha256(b"key-a", data, 24);
        let c = hmac_sha256(b"key-b", data, 24);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 24);
    }

    #[test]
    fn generate_is_deterministic_given_fixed_seed() {
        let seed = [0x5au8; 48];
        let mut a = HmacDrbg::new(&seed);
        let mut b = HmacDrbg::new(&seed);
        let mut out_a = [0u8; 64];
        let mut out_b = [0u8; 64];
        a.generate(&mut out_a).unwrap();
        b.generate(&mut out_b).unwrap();
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn successive_draws_differ() {
        let mut drbg = HmacDrbg::new(&[1u8; 48]);
        let mut first = [0u8; 32];
        let mut second = [0u8; 32];
        drbg.generate(&mut first).unwrap();
        drbg.generate(&mut second).unwrap();
        assert_ne!(first, second);
    }
}
