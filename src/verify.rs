//! Verification, §4.12. A free function rather than a method on `Signer` --
//! a verifier never needs a secret key, a DRBG, or any resumable state.

use std::convert::TryInto;

use crate::config::{Config, FaultStrategy, KeygenStrategy, SpeedSetting};
use crate::fors;
use crate::keygen::PublicKey;
use crate::lms::ots as lms_ots;
use crate::lms::tree as lms_tree;
use crate::merkle;
use crate::params::{
    LEN_LMS_PUBLIC_KEY, LEN_SPHINCS_SIG, LMS_H, LM_OTS_W2_PARAM_ID, LM_OTS_W4_PARAM_ID,
    LMS_TREE_PARAM_ID, N, SPH_A, SPH_D, SPH_K, SPH_T, SPH_WOTS_LEN,
};
use crate::primitives::FirstBlock;
use crate::tweak::{compute_digest_index, Tweak};
use crate::wots;

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let s = self.buf.get(self.pos..self.pos + n)?;
        self.pos += n;
        Some(s)
    }

    fn take_u32(&mut self) -> Option<u32> {
        let s = self.take(4)?;
        Some(u32::from_be_bytes(s.try_into().ok()?))
    }
}

/// Verifies `signature` over `message` against `pk`. Returns `false` for
/// any malformed input -- there is no protocol difference between
/// "forged" and "malformed" from a caller's point of view.
pub fn verify(message: &[u8], signature: &[u8], pk: &PublicKey) -> bool {
    try_verify(message, signature, pk).unwrap_or(false)
}

fn try_verify(message: &[u8], sig: &[u8], pk: &PublicKey) -> Option<bool> {
    let mut c = Cursor { buf: sig, pos: 0 };

    if c.take_u32()? != 0 {
        return Some(false);
    }
    let leaf = c.take_u32()?;
    let ots_param_id = c.take_u32()?;
    let speed = match ots_param_id {
        LM_OTS_W4_PARAM_ID => SpeedSetting::Slow,
        LM_OTS_W2_PARAM_ID => SpeedSetting::Fast,
        _ => return Some(false),
    };
    // FaultStrategy/KeygenStrategy don't affect OTS geometry, so any value
    // here reconstructs the same (w, p, ls) the signer used.
    let cfg = Config::new(speed, KeygenStrategy::Sha256, FaultStrategy::None, false);
    let p = cfg.ots_p();

    let c_rand = c.take(N)?.to_vec();
    let mut chains = Vec::with_capacity(p);
    for _ in 0..p {
        chains.push(c.take(N)?.to_vec());
    }

    if c.take_u32()? != LMS_TREE_PARAM_ID {
        return Some(false);
    }
    let mut auth_path = Vec::with_capacity(LMS_H);
    for _ in 0..LMS_H {
        auth_path.push(c.take(N)?.to_vec());
    }

    let lms_pub = c.take(LEN_LMS_PUBLIC_KEY)?;
    let sphincs_sig = c.take(LEN_SPHINCS_SIG)?;

    let lms_version: [u8; 4] = lms_pub[0..4].try_into().ok()?;
    if u32::from_be_bytes(lms_version) != 1 {
        return Some(false);
    }
    let lms_tree_param: [u8; 4] = lms_pub[4..8].try_into().ok()?;
    if u32::from_be_bytes(lms_tree_param) != LMS_TREE_PARAM_ID {
        return Some(false);
    }
    let embedded_ots_param: [u8; 4] = lms_pub[8..12].try_into().ok()?;
    if u32::from_be_bytes(embedded_ots_param) != ots_param_id {
        return Some(false);
    }
    let i16: [u8; 16] = lms_pub[12..28].try_into().ok()?;
    let lms_root = &lms_pub[28..28 + N];

    let recovered_ots_pk = lms_ots::recover_public_key(&i16, leaf, message, &c_rand, &chains, &cfg);
    let leaf_value = lms_ots::leaf_hash(&i16, leaf, LMS_H as u32, &recovered_ots_pk);
    let recomputed_root = lms_tree::root_from_auth_path(&i16, leaf, &leaf_value, &auth_path);
    if recomputed_root.as_slice() != lms_root {
        return Some(false);
    }

    let mut sc = Cursor { buf: sphincs_sig, pos: 0 };
    let r = sc.take(N)?;

    let pre = FirstBlock::new(&pk.pk_seed);
    let tw = Tweak::new(&pre);
    let digest = compute_digest_index(r, &pk.pk_seed, &pk.pk_root, lms_pub);

    let mut fors_roots = Vec::with_capacity(SPH_K);
    for (t, md) in digest.md.iter().enumerate() {
        let reveal = sc.take(N)?;
        let mut path = Vec::with_capacity(SPH_A);
        for _ in 0..SPH_A {
            path.push(sc.take(N)?.to_vec());
        }
        let target = u16::from_be_bytes(*md) as u32;
        fors_roots.push(fors::root_from_auth_path(&tw, digest.idx_tree, t as u32, target, reveal, &path));
    }
    let mut node = fors::compress_roots(&tw, &fors_roots);

    let mut idx_tree = digest.idx_tree;
    let mut idx_leaf = digest.idx_leaf;
    let mask = (1u64 << SPH_T) - 1;
    for level in 0..SPH_D {
        let mut wots_sig = Vec::with_capacity(SPH_WOTS_LEN);
        for _ in 0..SPH_WOTS_LEN {
            wots_sig.push(sc.take(N)?.to_vec());
        }
        let mut message_n = [0u8; N];
        message_n.copy_from_slice(&node);
        let leaf_value = wots::recover_leaf(&tw, level as u8, idx_tree, idx_leaf, &message_n, &wots_sig);

        let mut path = Vec::with_capacity(SPH_T);
        for _ in 0..SPH_T {
            path.push(sc.take(N)?.to_vec());
        }
        node = merkle::root_from_auth_path(&tw, level as u8, idx_tree, idx_leaf, &leaf_value, &path);

        idx_leaf = (idx_tree & mask) as u32;
        idx_tree >>= SPH_T;
    }

    Some(node.as_slice() == &pk.pk_root[..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_header_is_rejected() {
        let pk = PublicKey {
            param: crate::keygen::PARAM_TAG,
            pk_seed: [0u8; N],
            pk_root: [0u8; N],
        };
        // Non-zero where a BE32(0) is required.
        let sig = vec![0xffu8; 4 + LEN_LMS_PUBLIC_KEY + LEN_SPHINCS_SIG];
        assert!(!verify(b"msg", &sig, &pk));
    }

    #[test]
    fn truncated_signature_is_rejected() {
        let pk = PublicKey {
            param: crate::keygen::PARAM_TAG,
            pk_seed: [0u8; N],
            pk_root: [0u8; N],
        };
        let sig = vec![0u8; 4];
        assert!(!verify(b"msg", &sig, &pk));
    }
}
