//! WOTS+ one-time signatures used inside the SPHINCS+ hypertree (always
//! the w=4/51-chain geometry, independent of the LMS `SpeedSetting`, see
//! `params::SPH_WOTS_LEN`). Distinct from `lms::ots`, which implements
//! the LM-OTS scheme (RFC 8554 buffer layout, configurable width).

use crate::adr::Adr;
use crate::params::{AdrType, N, SPH_WOTS_LEN};
use crate::prf::PrivateKeyGenerator;
use crate::tweak::Tweak;

const W_BITS: u32 = 4;
const MAX_DIGIT: u32 = (1 << W_BITS) - 1; // 15
const MSG_DIGITS: usize = 8 * N / W_BITS as usize; // 48
const CHK_DIGITS: usize = SPH_WOTS_LEN - MSG_DIGITS; // 3
const LS: u32 = 4;

fn digits(message: &[u8; N]) -> Vec<u32> {
    let mut out = Vec::with_capacity(SPH_WOTS_LEN);
    for idx in 0..MSG_DIGITS {
        let byte = message[idx / 2];
        let shift = if idx % 2 == 0 { 4 } else { 0 };
        out.push(((byte >> shift) & 0x0f) as u32);
    }
    let sum: u32 = out.iter().map(|d| MAX_DIGIT - d).sum();
    let cksm = (sum << LS) as u16;
    let cksm_bytes = cksm.to_be_bytes();
    for idx in 0..CHK_DIGITS {
        let byte = cksm_bytes[idx / 2];
        let shift = if idx % 2 == 0 { 4 } else { 0 };
        out.push(((byte >> shift) & 0x0f) as u32);
    }
    out
}

fn leaf_tag(layer: u8, tree_idx: u64, leaf: u32, chain: u32) -> Vec<u8> {
    let mut tag = Vec::with_capacity(1 + 8 + 4 + 4);
    tag.push(layer);
    tag.extend_from_slice(&tree_idx.to_be_bytes());
    tag.extend_from_slice(&leaf.to_be_bytes());
    tag.extend_from_slice(&chain.to_be_bytes());
    tag
}

/// Signs `message` (the previous layer's root, padded/truncated to n
/// bytes) with the WOTS+ keypair at `(layer, tree_idx, leaf)`.
pub fn sign(
    tw: &Tweak,
    prf: &PrivateKeyGenerator,
    layer: u8,
    tree_idx: u64,
    leaf: u32,
    message: &[u8; N],
) -> Vec<Vec<u8>> {
    let mut adr = Adr::new();
    adr.set_layer_address(layer);
    adr.set_tree_address(tree_idx);
    adr.set_type(AdrType::WotsHash);
    adr.set_key_pair_address(leaf);

    let ds = digits(message);
    let mut sig = Vec::with_capacity(SPH_WOTS_LEN);
    for (i, &d) in ds.iter().enumerate() {
        let tag = leaf_tag(layer, tree_idx, leaf, i as u32);
        let mut node = prf.derive(&tag, N);
        let mut chain_adr = adr;
        chain_adr.set_chain_address(i as u32);
        for j in 0..d {
            chain_adr.set_hash_address(j);
            node = tw.f(&chain_adr, &node);
        }
        sig.push(node);
    }
    sig
}

/// Recovers the compressed WOTS+ leaf value from a signature, for
/// verification.
pub fn recover_leaf(
    tw: &Tweak,
    layer: u8,
    tree_idx: u64,
    leaf: u32,
    message: &[u8; N],
    sig: &[Vec<u8>],
) -> Vec<u8> {
    let mut adr = Adr::new();
    adr.set_layer_address(layer);
    adr.set_tree_address(tree_idx);
    adr.set_type(AdrType::WotsHash);
    adr.set_key_pair_address(leaf);

    let ds = digits(message);
    let mut pk_chains = Vec::with_capacity(SPH_WOTS_LEN * N);
    for (i, &d) in ds.iter().enumerate() {
        let mut chain_adr = adr;
        chain_adr.set_chain_address(i as u32);
        let mut node = sig[i].clone();
        for j in d..MAX_DIGIT {
            chain_adr.set_hash_address(j);
            node = tw.f(&chain_adr, &node);
        }
        pk_chains.extend_from_slice(&node);
    }

    let mut compress_adr = adr;
    compress_adr.set_type(AdrType::WotsPkCompress);
    compress_adr.set_key_pair_address(leaf);
    tw.t(&compress_adr, &pk_chains)
}
