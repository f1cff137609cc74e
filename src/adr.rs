//! The 22-byte tweakable-hash address (ADR), §4.1. Stored flat rather than
//! as a struct of disjoint fields: `chain_address`/`tree_height` and
//! `hash_address`/`tree_index` alias the same bytes depending on which
//! hash family is in play, exactly as the wire layout does.

use crate::params::AdrType;

pub const ADR_LEN: usize = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adr([u8; ADR_LEN]);

impl Adr {
    pub fn new() -> Self {
        Adr([0u8; ADR_LEN])
    }

    pub fn as_bytes(&self) -> &[u8; ADR_LEN] {
        &self.0
    }

    pub fn set_layer_address(&mut self, layer: u8) {
        self.0[0] = layer;
    }

    pub fn set_tree_address(&mut self, tree: u64) {
        self.0[1..9].copy_from_slice(&tree.to_be_bytes());
    }

    /// Sets the address type and clears every field after it, matching the
    /// legacy convention that later setters only ever write into a freshly
    /// cleared tail.
    pub fn set_type(&mut self, ty: AdrType) {
        self.0[9] = ty as u8;
        for b in &mut self.0[10..ADR_LEN] {
            *b = 0;
        }
    }

    pub fn set_key_pair_address(&mut self, idx: u32) {
        self.0[10..14].copy_from_slice(&idx.to_be_bytes());
    }

    pub fn set_chain_address(&mut self, chain: u32) {
        self.0[14..18].copy_from_slice(&chain.to_be_bytes());
    }

    pub fn set_hash_address(&mut self, hash: u32) {
        self.0[18..22].copy_from_slice(&hash.to_be_bytes());
    }

    pub fn set_tree_height(&mut self, height: u32) {
        self.0[14..18].copy_from_slice(&height.to_be_bytes());
    }

    pub fn set_tree_index(&mut self, index: u32) {
        self.0[18..22].copy_from_slice(&index.to_be_bytes());
    }
}

impl Default for Adr {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_type_clears_tail() {
        let mut adr = Adr::new();
        adr.set_tree_index(0xffff_ffff);
        adr.set_type(AdrType::HashTree);
        assert_eq!(&adr.as_bytes()[10..22], &[0u8; 12]);
        assert_eq!(adr.as_bytes()[9], AdrType::HashTree as u8);
    }

    #[test]
    fn aliasing_matches_offsets() {
        let mut a = Adr::new();
        a.set_type(AdrType::WotsHash);
        a.set_chain_address(7);
        assert_eq!(a.as_bytes()[14..18], 7u32.to_be_bytes());
        let mut b = Adr::new();
        b.set_type(AdrType::HashTree);
        b.set_tree_height(7);
        assert_eq!(b.as_bytes()[14..18], 7u32.to_be_bytes());
    }

    #[test]
    fn layer_and_tree_survive_set_type() {
        let mut a = Adr::new();
        a.set_layer_address(3);
        a.set_tree_address(0x0102_0304_0506_0708);
        a.set_type(AdrType::ForsTree);
        assert_eq!(a.as_bytes()[0], 3);
        assert_eq!(&a.as_bytes()[1..9], &0x0102_0304_0506_0708u64.to_be_bytes());
    }
}
