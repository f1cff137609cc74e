//! Generic resumable Merkle (XMSS-style) tree builder, §4.7. Used both by
//! `keygen` (to compute the SPHINCS+ top root in one uninterrupted run)
//! and by the hypertree portion of the signer state machine (one bounded
//! `step` per call).

use crate::adr::Adr;
use crate::params::{AdrType, N, SPH_WOTS_LEN};
use crate::prf::PrivateKeyGenerator;
use crate::tweak::Tweak;

/// One entry of the treehash stack: (height, index-at-that-height, value).
type StackNode = (usize, u64, Vec<u8>);

/// Note: does not borrow the signer's `Tweak`/`FirstBlock` -- `step` takes
/// one by reference instead, so a `Signer` can own both a `MerkleBuilder`
/// and the `FirstBlock` it hashes with side by side without a
/// self-referential struct.
pub struct MerkleBuilder {
    prf: PrivateKeyGenerator,
    height: usize,
    layer: u8,
    tree_idx: u64,
    /// Leaf whose authentication path should be recorded, if any.
    target_leaf: Option<u32>,
    next_leaf: u32,
    total_leaves: u32,
    stack: Vec<StackNode>,
    auth_path: Vec<Option<Vec<u8>>>,
    root: Option<Vec<u8>>,
}

impl MerkleBuilder {
    pub fn new(
        prf: PrivateKeyGenerator,
        layer: u8,
        tree_idx: u64,
        height: usize,
        target_leaf: Option<u32>,
    ) -> Self {
        MerkleBuilder {
            prf,
            height,
            layer,
            tree_idx,
            target_leaf,
            next_leaf: 0,
            total_leaves: 1u32 << height,
            stack: Vec::with_capacity(height + 1),
            auth_path: vec![None; height],
            root: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.root.is_some()
    }

    pub fn root(&self) -> Option<&[u8]> {
        self.root.as_deref()
    }

    pub fn auth_path(&self) -> &[Option<Vec<u8>>] {
        &self.auth_path
    }

    /// Advances the build by up to `leaves_per_step` WOTS+ leaf
    /// computations. Returns `true` once the root has been produced.
    pub fn step(&mut self, tw: &Tweak, leaves_per_step: usize) -> bool {
        for _ in 0..leaves_per_step {
            if self.next_leaf >= self.total_leaves {
                break;
            }
            let leaf_value = self.wots_leaf(tw, self.next_leaf);
            self.push_and_reduce(tw, self.next_leaf as u64, 0, leaf_value);
            self.next_leaf += 1;
        }
        self.root.is_some()
    }

    fn wots_leaf(&self, tw: &Tweak, leaf: u32) -> Vec<u8> {
        let mut adr = Adr::new();
        adr.set_layer_address(self.layer);
        adr.set_tree_address(self.tree_idx);
        adr.set_type(AdrType::WotsHash);
        adr.set_key_pair_address(leaf);

        let mut pk_chains = Vec::with_capacity(SPH_WOTS_LEN * N);
        for i in 0..SPH_WOTS_LEN as u32 {
            let mut tag = Vec::with_capacity(1 + 8 + 4 + 4);
            tag.push(self.layer);
            tag.extend_from_slice(&self.tree_idx.to_be_bytes());
            tag.extend_from_slice(&leaf.to_be_bytes());
            tag.extend_from_slice(&i.to_be_bytes());
            let mut chain_adr = adr;
            chain_adr.set_chain_address(i);
            chain_adr.set_hash_address(0);
            let mut node = self.prf.derive(&tag, N);
            for j in 0..15u32 {
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

    fn push_and_reduce(&mut self, tw: &Tweak, idx: u64, height: usize, value: Vec<u8>) {
        let node: StackNode = (height, idx, value);
        self.maybe_capture(&node);
        self.stack.push(node);
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

            let mut adr = Adr::new();
            adr.set_layer_address(self.layer);
            adr.set_tree_address(self.tree_idx);
            adr.set_type(AdrType::HashTree);
            adr.set_tree_height(h as u32);
            adr.set_tree_index(parent_idx as u32);
            let combined = tw.h(&adr, &left.2, &right.2);

            let parent: StackNode = (h, parent_idx, combined);
            self.maybe_capture(&parent);
            if h == self.height {
                self.root = Some(parent.2.clone());
            }
            self.stack.push(parent);
        }
    }

    fn maybe_capture(&mut self, node: &StackNode) {
        if let Some(target) = self.target_leaf {
            if node.0 >= self.auth_path.len() {
                return;
            }
            let path_idx_at_h = (target as u64) >> node.0;
            let sibling = path_idx_at_h ^ 1;
            if node.1 == sibling {
                self.auth_path[node.0] = Some(node.2.clone());
            }
        }
    }
}

/// Reconstructs a hypertree layer's root from a compressed WOTS+ leaf and
/// its authentication path, for verification.
pub fn root_from_auth_path(
    tw: &Tweak,
    layer: u8,
    tree_idx: u64,
    leaf_idx: u32,
    leaf_value: &[u8],
    auth_path: &[Vec<u8>],
) -> Vec<u8> {
    let mut node = leaf_value.to_vec();
    let mut idx = leaf_idx as u64;
    for (h, sibling) in auth_path.iter().enumerate() {
        let parent_idx = idx >> 1;
        let mut adr = Adr::new();
        adr.set_layer_address(layer);
        adr.set_tree_address(tree_idx);
        adr.set_type(AdrType::HashTree);
        adr.set_tree_height(h as u32 + 1);
        adr.set_tree_index(parent_idx as u32);
        node = if idx & 1 == 0 {
            tw.h(&adr, &node, sibling)
        } else {
            tw.h(&adr, sibling, &node)
        };
        idx = parent_idx;
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::FirstBlock;

    #[test]
    fn small_tree_completes_and_produces_consistent_root() {
        let pk_seed = [1u8; N];
        let pre = FirstBlock::new(&pk_seed);
        let tw = Tweak::new(&pre);

        let prf_a = PrivateKeyGenerator::new_sha256(&[2u8; N], &[0u8; 16]);
        let mut a = MerkleBuilder::new(prf_a, 0, 0, 3, Some(5));
        while !a.step(&tw, 1) {}
        let root_a = a.root().unwrap().to_vec();
        assert!(a.auth_path().iter().all(|n| n.is_some()));

        let prf_b = PrivateKeyGenerator::new_sha256(&[2u8; N], &[0u8; 16]);
        let mut b = MerkleBuilder::new(prf_b, 0, 0, 3, None);
        while !b.step(&tw, 2) {}
        assert_eq!(root_a, b.root().unwrap());
    }

    #[test]
    fn auth_path_reconstructs_root() {
        let pk_seed = [4u8; N];
        let pre = FirstBlock::new(&pk_seed);
        let tw = Tweak::new(&pre);

        let target = 3u32;
        let prf = PrivateKeyGenerator::new_sha256(&[7u8; N], &[0u8; 16]);
        let mut builder = MerkleBuilder::new(prf, 2, 9, 3, Some(target));
        while !builder.step(&tw, 1) {}

        let root = builder.root().unwrap().to_vec();
        let leaf_value = builder.wots_leaf(&tw, target);
        let path: Vec<Vec<u8>> = builder
            .auth_path()
            .iter()
            .map(|n| n.clone().unwrap())
            .collect();

        let recomputed = root_from_auth_path(&tw, 2, 9, target, &leaf_value, &path);
        assert_eq!(root, recomputed);
    }
}
