//! The LMS Merkle tree, §4.9. Each signer keeps two of these (current,
//! next); the "next" tree is built incrementally, one `step` per call to
//! `Signer::sign`, and becomes "current" at the `b_done` rotation.
//!
//! The legacy implementation splits the actual tree into a top and bottom
//! subtree and only keeps a sliding window of the bottom subtree's nodes
//! around the frontier of in-use leaves, to bound memory for a 2^20-leaf
//! tree. Since the tree actually built here is already bounded to
//! `2^lms_actual` leaves (a few thousand to a few tens of thousands —
//! see `Config::lms_actual`), this crate keeps every internal node of
//! both subtrees for the life of the tree rather than rolling the bottom
//! subtree's window; see DESIGN.md for the tradeoff.

use std::collections::HashMap;

use crate::config::Config;
use crate::lms::ots;
use crate::params::N;
use crate::prf::PrivateKeyGenerator;

type NodeKey = (usize, u64);

pub struct LmsTreeBuilder {
    i16: [u8; 16],
    prf: PrivateKeyGenerator,
    height: usize,
    bottom_height: usize,
    next_leaf: u32,
    total_leaves: u32,
    bottom_nodes: HashMap<NodeKey, Vec<u8>>,
    top_nodes: HashMap<NodeKey, Vec<u8>>,
    stack: Vec<(usize, u64, Vec<u8>)>,
    root: Option<Vec<u8>>,
}

impl LmsTreeBuilder {
    pub fn new(i16: [u8; 16], seed: &[u8; 32], cfg: &Config) -> Self {
        Self::with_height(i16, seed, cfg.lms_actual(), cfg.lms_bottom(), cfg)
    }

    fn with_height(i16: [u8; 16], seed: &[u8; 32], height: usize, bottom_height: usize, cfg: &Config) -> Self {
        LmsTreeBuilder {
            prf: PrivateKeyGenerator::for_config(cfg, seed, &i16),
            i16,
            height,
            bottom_height,
            next_leaf: 0,
            total_leaves: 1u32 << height,
            bottom_nodes: HashMap::new(),
            top_nodes: HashMap::new(),
            stack: Vec::with_capacity(height + 1),
            root: None,
        }
    }

    pub fn identifier(&self) -> &[u8; 16] {
        &self.i16
    }

    pub fn prf(&self) -> &PrivateKeyGenerator {
        &self.prf
    }

    pub fn is_done(&self) -> bool {
        self.root.is_some()
    }

    pub fn root(&self) -> Option<&[u8]> {
        self.root.as_deref()
    }

    pub fn leaves_built(&self) -> u32 {
        self.next_leaf
    }

    pub fn total_leaves(&self) -> u32 {
        self.total_leaves
    }

    /// Advances the build by up to `leaves_per_step` OTS leaves. Returns
    /// `true` once the root is available.
    pub fn step(&mut self, leaves_per_step: usize, cfg: &Config) -> bool {
        for _ in 0..leaves_per_step {
            if self.next_leaf >= self.total_leaves {
                break;
            }
            let leaf = self.next_leaf;
            let pk = ots::public_key(&self.prf, &self.i16, leaf, cfg);
            // `r` is keyed off the full logical LMS height (always 20),
            // not the physically-reduced `self.height` -- LMS_FAKE only
            // shortens how much of the tree is actually computed, it does
            // not change the canonical leaf-naming convention.
            let value = ots::leaf_hash(&self.i16, leaf, crate::params::LMS_H as u32, &pk);
            self.push_and_reduce(leaf as u64, value);
            self.next_leaf += 1;
        }
        self.root.is_some()
    }

    fn push_and_reduce(&mut self, idx: u64, value: Vec<u8>) {
        self.store(0, idx, &value);
        self.stack.push((0, idx, value));
        while self.stack.len() >= 2 {
            let top_h = self.stack[self.stack.len() - 1].0;
            let below_h = self.stack[self.stack.len() - 2].0;
            if top_h != below_h {
                break;
            }
            let right = self.stack.pop().unwrap();
            let left = self.stack.pop().unwrap();
            let h = top_h + 1;
            let parent_idx = left.1 >> 1;
            let mut buf = Vec::with_capacity(21 + 2 * N);
            buf.extend_from_slice(&self.i16);
            buf.extend_from_slice(&(parent_idx as u32).to_be_bytes());
            buf.push(crate::params::D_INTR);
            buf.extend_from_slice(&left.2);
            buf.extend_from_slice(&right.2);
            let combined = crate::primitives::sha256(&buf)[..N].to_vec();

            self.store(h, parent_idx, &combined);
            if h == self.height {
                self.root = Some(combined.clone());
            }
            self.stack.push((h, parent_idx, combined));
        }
    }

    fn store(&mut self, height: usize, idx: u64, value: &[u8]) {
        let map = if height <= self.bottom_height {
            &mut self.bottom_nodes
        } else {
            &mut self.top_nodes
        };
        map.insert((height, idx), value.to_vec());
    }

    fn node(&self, height: usize, idx: u64) -> Option<&Vec<u8>> {
        if height <= self.bottom_height {
            self.bottom_nodes.get(&(height, idx))
        } else {
            self.top_nodes.get(&(height, idx))
        }
    }

    /// The `height`-long authentication path for `leaf`.
    pub fn auth_path(&self, leaf: u32) -> Option<Vec<Vec<u8>>> {
        let mut path = Vec::with_capacity(self.height);
        for h in 0..self.height {
            let sibling = (leaf as u64 >> h) ^ 1;
            path.push(self.node(h, sibling)?.clone());
        }
        Some(path)
    }
}

/// Assembles the 52-byte LMS public key: `1 || LMS_TREE_PARAM_ID ||
/// LM_OTS_PARAM_ID || I || root`.
pub fn public_key_bytes(i16: &[u8; 16], root: &[u8], ots_param_id: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(crate::params::LEN_LMS_PUBLIC_KEY);
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(&crate::params::LMS_TREE_PARAM_ID.to_be_bytes());
    out.extend_from_slice(&ots_param_id.to_be_bytes());
    out.extend_from_slice(i16);
    out.extend_from_slice(root);
    out
}

/// Reconstructs the LMS root from a leaf hash and its authentication
/// path, for verification.
pub fn root_from_auth_path(i16: &[u8; 16], leaf_idx: u32, leaf_value: &[u8], auth_path: &[Vec<u8>]) -> Vec<u8> {
    let mut node = leaf_value.to_vec();
    let mut idx = leaf_idx as u64;
    for sibling in auth_path {
        let parent_idx = idx >> 1;
        let mut buf = Vec::with_capacity(21 + 2 * N);
        buf.extend_from_slice(i16);
        buf.extend_from_slice(&(parent_idx as u32).to_be_bytes());
        buf.push(crate::params::D_INTR);
        if idx & 1 == 0 {
            buf.extend_from_slice(&node);
            buf.extend_from_slice(sibling);
        } else {
            buf.extend_from_slice(sibling);
            buf.extend_from_slice(&node);
        }
        node = crate::primitives::sha256(&buf)[..N].to_vec();
        idx = parent_idx;
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, FaultStrategy, KeygenStrategy, SpeedSetting};

    fn fast_cfg() -> Config {
        Config::new(SpeedSetting::Fast, KeygenStrategy::Sha256, FaultStrategy::None, false)
    }

    #[test]
    fn auth_path_reconstructs_root() {
        let cfg = fast_cfg();
        let i16 = [4u8; 16];
        let seed = [5u8; 32];
        // Height 4 keeps the test fast; production height comes from
        // Config::lms_actual() via LmsTreeBuilder::new.
        let mut builder = LmsTreeBuilder::with_height(i16, &seed, 4, 2, &cfg);
        while !builder.step(1, &cfg) {}
        let root = builder.root().unwrap().to_vec();

        let leaf = 5u32;
        let pk = ots::public_key(&builder.prf, &i16, leaf, &cfg);
        let leaf_value = ots::leaf_hash(&i16, leaf, crate::params::LMS_H as u32, &pk);
        let path = builder.auth_path(leaf).expect("path available");
        let recomputed = root_from_auth_path(&i16, leaf, &leaf_value, &path);
        assert_eq!(root, recomputed);
    }

    #[test]
    fn public_key_bytes_has_expected_length_and_header() {
        let i16 = [1u8; 16];
        let root = [2u8; N];
        let pk = public_key_bytes(&i16, &root, crate::params::LM_OTS_W2_PARAM_ID);
        assert_eq!(pk.len(), crate::params::LEN_LMS_PUBLIC_KEY);
        assert_eq!(&pk[0..4], &1u32.to_be_bytes());
        assert_eq!(&pk[4..8], &crate::params::LMS_TREE_PARAM_ID.to_be_bytes());
    }
}
