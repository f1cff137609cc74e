//! Private-key generator: a deterministic PRF turning a secret seed plus a
//! per-leaf tag into an n-byte secret value. Two interchangeable
//! strategies, selected once at `Signer` construction via
//! `Config::keygen_strategy`; switching strategies invalidates existing
//! secret keys but never already-issued signatures.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, NewBlockCipher};
use aes::Aes256;
use zeroize::Zeroize;

use crate::config::{Config, KeygenStrategy};
use crate::primitives::sha256;

pub enum PrivateKeyGenerator {
    Sha256 { prehash: Vec<u8> },
    Aes256 { cipher: Aes256, init: [u8; 16] },
}

/// Absorbs `data` 16 bytes at a time into `chain` by xor-then-encrypt
/// (zero-padding the final partial block), CBC-MAC style.
fn absorb(cipher: &Aes256, mut chain: [u8; 16], data: &[u8]) -> [u8; 16] {
    for block in data.chunks(16) {
        let mut b = [0u8; 16];
        b[..block.len()].copy_from_slice(block);
        for i in 0..16 {
            b[i] ^= chain[i];
        }
        let mut ga = GenericArray::clone_from_slice(&b);
        cipher.encrypt_block(&mut ga);
        chain.copy_from_slice(&ga);
    }
    chain
}

impl PrivateKeyGenerator {
    pub fn new(strategy: KeygenStrategy, secret: &[u8], fixed_prefix: &[u8]) -> Self {
        match strategy {
            KeygenStrategy::Sha256 => Self::new_sha256(secret, fixed_prefix),
            KeygenStrategy::Aes256 => Self::new_aes256(secret, fixed_prefix),
        }
    }

    pub fn for_config(cfg: &Config, secret: &[u8], fixed_prefix: &[u8]) -> Self {
        Self::new(cfg.keygen_strategy, secret, fixed_prefix)
    }

    /// `secret`: the seed (n bytes). `fixed_prefix`: extra bytes absorbed
    /// once at construction (e.g. the LMS identifier `I`).
    pub fn new_sha256(secret: &[u8], fixed_prefix: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(secret.len() + fixed_prefix.len());
        buf.extend_from_slice(secret);
        buf.extend_from_slice(fixed_prefix);
        let prehash = sha256(&buf).to_vec();
        buf.zeroize();
        PrivateKeyGenerator::Sha256 { prehash }
    }

    pub fn new_aes256(secret: &[u8], fixed_prefix: &[u8]) -> Self {
        let mut key = [0u8; 32];
        key[..secret.len().min(32)].copy_from_slice(&secret[..secret.len().min(32)]);
        let cipher = Aes256::new(GenericArray::from_slice(&key));
        key.zeroize();
        let init = absorb(&cipher, [0u8; 16], fixed_prefix);
        PrivateKeyGenerator::Aes256 { cipher, init }
    }

    /// Derives `n` bytes from an arbitrary-length per-leaf `tag` (e.g. a
    /// packed `layer || tree || leaf || chain` address).
    pub fn derive(&self, tag: &[u8], n: usize) -> Vec<u8> {
        match self {
            PrivateKeyGenerator::Sha256 { prehash } => {
                let mut buf = Vec::with_capacity(prehash.len() + tag.len());
                buf.extend_from_slice(prehash);
                buf.extend_from_slice(tag);
                let out = sha256(&buf);
                buf.zeroize();
                out[..n].to_vec()
            }
            PrivateKeyGenerator::Aes256 { cipher, init } => {
                let chained = absorb(cipher, *init, tag);
                let mut out = Vec::with_capacity(n);
                let mut block = chained;
                loop {
                    let mut ga = GenericArray::clone_from_slice(&block);
                    cipher.encrypt_block(&mut ga);
                    let produced: [u8; 16] = ga.into();
                    let take = (n - out.len()).min(16);
                    out.extend_from_slice(&produced[..take]);
                    if out.len() >= n {
                        break;
                    }
                    block = produced;
                }
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_strategy_is_deterministic() {
        let prf = PrivateKeyGenerator::new_sha256(&[1u8; 24], &[2u8; 16]);
        let a = prf.derive(&[3u8; 16], 24);
        let b = prf.derive(&[3u8; 16], 24);
        assert_eq!(a, b);
    }

    #[test]
    fn aes256_strategy_is_deterministic_and_varies_with_tag() {
        let prf = PrivateKeyGenerator::new_aes256(&[1u8; 32], &[2u8; 16]);
        let a = prf.derive(&[3u8; 16], 24);
        let b = prf.derive(&[4u8; 16], 24);
        assert_ne!(a, b);
        let a2 = prf.derive(&[3u8; 16], 24);
        assert_eq!(a, a2);
    }

    #[test]
    fn derive_supports_lengths_over_one_block() {
        let prf = PrivateKeyGenerator::new_aes256(&[9u8; 32], &[]);
        let out = prf.derive(&[0u8; 16], 40);
        assert_eq!(out.len(), 40);
    }

    #[test]
    fn derive_supports_tags_longer_than_one_block() {
        let prf = PrivateKeyGenerator::new_aes256(&[9u8; 32], &[]);
        let out = prf.derive(&[7u8; 40], 24);
        assert_eq!(out.len(), 24);
    }
}
