//! FORS (forest of random subsets) few-time signature, the bottom layer
//! of a SPHINCS+ signature. Builds `SPH_K` trees of height `SPH_A` each,
//! incrementally, driven by the signer's `b_fors`/`b_complete_fors`
//! states.

use crate::adr::Adr;
use crate::params::{AdrType, N, SPH_A, SPH_K};
use crate::prf::PrivateKeyGenerator;
use crate::tweak::Tweak;

type StackNode = (usize, u64, Vec<u8>);

/// Builds a single FORS tree (one of the `SPH_K` trees), recording the
/// revealed leaf secret and authentication path for `target_leaf`.
///
/// `hyper_tree_idx` is the hypertree coordinate this FORS forest belongs to
/// (the ADR's `tree_address`); `tree_num` is this FORS tree's own number
/// (0..SPH_K) within that forest, folded into the node index rather than
/// the tree address -- see `combined_index`.
pub struct ForsTreeBuilder {
    hyper_tree_idx: u64,
    tree_num: u32,
    target_leaf: u32,
    next_leaf: u32,
    total_leaves: u32,
    stack: Vec<StackNode>,
    auth_path: Vec<Option<Vec<u8>>>,
    reveal: Option<Vec<u8>>,
    root: Option<Vec<u8>>,
}

/// Folds this FORS tree's number into the node index so each of the
/// `SPH_K` trees occupies its own disjoint `2^(SPH_A-height)`-wide range
/// under the shared `hyper_tree_idx` address -- the node naming §4.10
/// requires (`leaf_in_tree + tree_num << SPH_A`, then halved per level).
fn combined_index(tree_num: u32, local_idx: u64) -> u64 {
    local_idx + ((tree_num as u64) << SPH_A)
}

impl ForsTreeBuilder {
    pub fn new(hyper_tree_idx: u64, tree_num: u32, target_leaf: u32) -> Self {
        ForsTreeBuilder {
            hyper_tree_idx,
            tree_num,
            target_leaf,
            next_leaf: 0,
            total_leaves: 1u32 << SPH_A,
            stack: Vec::with_capacity(SPH_A + 1),
            auth_path: vec![None; SPH_A],
            reveal: None,
            root: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.root.is_some()
    }

    pub fn root(&self) -> Option<&[u8]> {
        self.root.as_deref()
    }

    pub fn reveal(&self) -> Option<&[u8]> {
        self.reveal.as_deref()
    }

    pub fn auth_path(&self) -> Option<Vec<Vec<u8>>> {
        self.auth_path.iter().cloned().collect()
    }

    pub fn step(&mut self, tw: &Tweak, prf: &PrivateKeyGenerator, leaves_per_step: usize) -> bool {
        for _ in 0..leaves_per_step {
            if self.next_leaf >= self.total_leaves {
                break;
            }
            let leaf = self.next_leaf;
            let mut state = [0u8; 16];
            state[0..4].copy_from_slice(&self.tree_num.to_be_bytes());
            state[4..8].copy_from_slice(&leaf.to_be_bytes());
            let secret = prf.derive(&state, N);
            if leaf == self.target_leaf {
                self.reveal = Some(secret.clone());
            }

            let idx = combined_index(self.tree_num, leaf as u64);
            let mut adr = Adr::new();
            adr.set_type(AdrType::ForsTree);
            adr.set_tree_address(self.hyper_tree_idx);
            adr.set_tree_height(0);
            adr.set_tree_index(idx as u32);
            let value = tw.f(&adr, &secret);

            self.push_and_reduce(tw, idx, 0, value);
            self.next_leaf += 1;
        }
        self.root.is_some()
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
            adr.set_type(AdrType::ForsTree);
            adr.set_tree_address(self.hyper_tree_idx);
            adr.set_tree_height(h as u32);
            adr.set_tree_index(parent_idx as u32);
            let combined = tw.h(&adr, &left.2, &right.2);

            let parent: StackNode = (h, parent_idx, combined);
            self.maybe_capture(&parent);
            if h == SPH_A {
                self.root = Some(parent.2.clone());
            }
            self.stack.push(parent);
        }
    }

    fn maybe_capture(&mut self, node: &StackNode) {
        if node.0 >= self.auth_path.len() {
            return;
        }
        let target_idx = combined_index(self.tree_num, self.target_leaf as u64);
        let path_idx_at_h = target_idx >> node.0;
        let sibling = path_idx_at_h ^ 1;
        if node.1 == sibling {
            self.auth_path[node.0] = Some(node.2.clone());
        }
    }
}

/// Compresses the `SPH_K` FORS tree roots into the top FORS public
/// value, via T-hash under `ForsRootCompress`.
pub fn compress_roots(tw: &Tweak, roots: &[Vec<u8>]) -> Vec<u8> {
    debug_assert_eq!(roots.len(), SPH_K);
    let mut adr = Adr::new();
    adr.set_type(AdrType::ForsRootCompress);
    let mut input = Vec::with_capacity(SPH_K * N);
    for r in roots {
        input.extend_from_slice(r);
    }
    tw.t(&adr, &input)
}

/// Reconstructs one FORS tree's root from a revealed leaf secret and its
/// authentication path, for verification. `hyper_tree_idx`/`tree_num` must
/// match the values the signer built the tree under -- see
/// `ForsTreeBuilder`.
pub fn root_from_auth_path(
    tw: &Tweak,
    hyper_tree_idx: u64,
    tree_num: u32,
    leaf_idx: u32,
    secret: &[u8],
    auth_path: &[Vec<u8>],
) -> Vec<u8> {
    let mut idx = combined_index(tree_num, leaf_idx as u64);
    let mut adr = Adr::new();
    adr.set_type(AdrType::ForsTree);
    adr.set_tree_address(hyper_tree_idx);
    adr.set_tree_height(0);
    adr.set_tree_index(idx as u32);
    let mut node = tw.f(&adr, secret);
    for (h, sibling) in auth_path.iter().enumerate() {
        let parent_idx = idx >> 1;
        let mut node_adr = Adr::new();
        node_adr.set_type(AdrType::ForsTree);
        node_adr.set_tree_address(hyper_tree_idx);
        node_adr.set_tree_height(h as u32 + 1);
        node_adr.set_tree_index(parent_idx as u32);
        node = if idx & 1 == 0 {
            tw.h(&node_adr, &node, sibling)
        } else {
            tw.h(&node_adr, sibling, &node)
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
    fn auth_path_reconstructs_root() {
        let pk_seed = [6u8; N];
        let pre = FirstBlock::new(&pk_seed);
        let tw = Tweak::new(&pre);
        let prf = PrivateKeyGenerator::new_sha256(&[1u8; N], &[0u8; 16]);

        let target = 37u32;
        let mut b = ForsTreeBuilder::new(9, 2, target);
        while !b.step(&tw, &prf, 64) {}

        let root = b.root().unwrap().to_vec();
        let secret = b.reveal().unwrap().to_vec();
        let path: Vec<_> = b.auth_path().unwrap();

        let recomputed = root_from_auth_path(&tw, 9, 2, target, &secret, &path);
        assert_eq!(root, recomputed);
    }

    #[test]
    fn hypertree_coordinate_and_tree_num_both_separate_domains() {
        let pk_seed = [6u8; N];
        let pre = FirstBlock::new(&pk_seed);
        let tw = Tweak::new(&pre);
        let prf = PrivateKeyGenerator::new_sha256(&[1u8; N], &[0u8; 16]);

        let root_at = |hyper_tree_idx: u64, tree_num: u32| {
            let mut b = ForsTreeBuilder::new(hyper_tree_idx, tree_num, 0);
            while !b.step(&tw, &prf, 64) {}
            b.root().unwrap().to_vec()
        };

        let base = root_at(5, 2);
        assert_ne!(base, root_at(6, 2), "changing the hypertree leaf must change the root");
        assert_ne!(base, root_at(5, 3), "changing the FORS tree number must change the root");
    }
}
