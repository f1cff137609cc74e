//! Key generation and the key lifecycle (keygen / load / delete), §2
//! component 9, §4.11 "S1 Keygen".

use tracing::info;
use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::merkle::MerkleBuilder;
use crate::params::{LEN_PRIVKEY_192, LEN_PUBKEY_192, N, SPH_D, SPH_T};
use crate::prf::PrivateKeyGenerator;
use crate::primitives::{FirstBlock, RandFn};
use crate::tweak::Tweak;

/// `param_tag = [hash_function, n, fast, hash]`, matching the C layout;
/// `hash_function=1` (SHA-256), `n=24`, `fast=0`, `hash = 1 | (192<<?)`
/// collapse into the single literal byte sequence the legacy code emits
/// for its one supported setting.
pub const PARAM_TAG: [u8; 4] = [0x01, N as u8, 0x00, 0x05];

#[derive(Clone)]
pub struct SecretKey {
    pub param: [u8; 4],
    pub sk_seed: [u8; N],
    pub sk_prf: [u8; N],
    pub pk_seed: [u8; N],
    pub pk_root: [u8; N],
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.sk_seed.zeroize();
        self.sk_prf.zeroize();
    }
}

impl SecretKey {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(LEN_PRIVKEY_192);
        out.extend_from_slice(&self.param);
        out.extend_from_slice(&self.sk_seed);
        out.extend_from_slice(&self.sk_prf);
        out.extend_from_slice(&self.pk_seed);
        out.extend_from_slice(&self.pk_root);
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < LEN_PRIVKEY_192 {
            return Err(Error::ShortBuffer {
                needed: LEN_PRIVKEY_192,
                have: buf.len(),
            });
        }
        let mut param = [0u8; 4];
        param.copy_from_slice(&buf[0..4]);
        let mut sk_seed = [0u8; N];
        sk_seed.copy_from_slice(&buf[4..4 + N]);
        let mut sk_prf = [0u8; N];
        sk_prf.copy_from_slice(&buf[4 + N..4 + 2 * N]);
        let mut pk_seed = [0u8; N];
        pk_seed.copy_from_slice(&buf[4 + 2 * N..4 + 3 * N]);
        let mut pk_root = [0u8; N];
        pk_root.copy_from_slice(&buf[4 + 3 * N..4 + 4 * N]);
        Ok(SecretKey {
            param,
            sk_seed,
            sk_prf,
            pk_seed,
            pk_root,
        })
    }
}

#[derive(Clone)]
pub struct PublicKey {
    pub param: [u8; 4],
    pub pk_seed: [u8; N],
    pub pk_root: [u8; N],
}

impl PublicKey {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(LEN_PUBKEY_192);
        out.extend_from_slice(&self.param);
        out.extend_from_slice(&self.pk_seed);
        out.extend_from_slice(&self.pk_root);
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < LEN_PUBKEY_192 {
            return Err(Error::ShortBuffer {
                needed: LEN_PUBKEY_192,
                have: buf.len(),
            });
        }
        let mut param = [0u8; 4];
        param.copy_from_slice(&buf[0..4]);
        let mut pk_seed = [0u8; N];
        pk_seed.copy_from_slice(&buf[4..4 + N]);
        let mut pk_root = [0u8; N];
        pk_root.copy_from_slice(&buf[4 + N..4 + 2 * N]);
        Ok(PublicKey {
            param,
            pk_seed,
            pk_root,
        })
    }
}

/// Generates a fresh SPHINCS+ keypair: `3n` random bytes for
/// (sk_seed, sk_prf, pk_seed), then the top hypertree layer's Merkle
/// root computed in one uninterrupted run.
pub fn keygen(do_rand: RandFn) -> Result<(SecretKey, PublicKey)> {
    let mut seed_material = [0u8; 3 * N];
    if !do_rand(&mut seed_material) {
        return Err(Error::Entropy);
    }

    let mut sk_seed = [0u8; N];
    let mut sk_prf = [0u8; N];
    let mut pk_seed = [0u8; N];
    sk_seed.copy_from_slice(&seed_material[0..N]);
    sk_prf.copy_from_slice(&seed_material[N..2 * N]);
    pk_seed.copy_from_slice(&seed_material[2 * N..3 * N]);
    seed_material.zeroize();

    let pre = FirstBlock::new(&pk_seed);
    let tw = Tweak::new(&pre);
    let prf = PrivateKeyGenerator::new_sha256(&sk_seed, &pk_seed);

    let mut builder = MerkleBuilder::new(prf, (SPH_D - 1) as u8, 0, SPH_T, None);
    while !builder.step(&tw, 1) {}
    let mut pk_root = [0u8; N];
    pk_root.copy_from_slice(builder.root().expect("builder reports done"));

    info!(n = N, "generated new keypair");

    Ok((
        SecretKey {
            param: PARAM_TAG,
            sk_seed,
            sk_prf,
            pk_seed,
            pk_root,
        },
        PublicKey {
            param: PARAM_TAG,
            pk_seed,
            pk_root,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn keygen_pk_seed_matches_secret_key_copy() {
        let mut rand = counting_rand();
        let (sk, pk) = keygen(&mut rand).unwrap();
        assert_eq!(sk.pk_seed, pk.pk_seed);
        assert_eq!(sk.pk_root, pk.pk_root);
        assert_eq!(sk.to_bytes().len(), LEN_PRIVKEY_192);
        assert_eq!(pk.to_bytes().len(), LEN_PUBKEY_192);
    }

    #[test]
    fn keygen_round_trips_through_bytes() {
        let mut rand = counting_rand();
        let (sk, pk) = keygen(&mut rand).unwrap();
        let sk2 = SecretKey::from_bytes(&sk.to_bytes()).unwrap();
        let pk2 = PublicKey::from_bytes(&pk.to_bytes()).unwrap();
        assert_eq!(sk2.sk_seed, sk.sk_seed);
        assert_eq!(pk2.pk_root, pk.pk_root);
    }

    #[test]
    fn entropy_failure_is_reported() {
        let mut fail = |_: &mut [u8]| false;
        let result = keygen(&mut fail);
        assert!(matches!(result, Err(Error::Entropy)));
    }
}
