//! SHA-256 with a "first-block snapshot": every tweakable hash in this
//! crate is `SHA256(pk_seed_padded(64) || adr(22) || message)`, so the
//! compression of the fixed 64-byte `pk_seed_padded` prefix is done once
//! per signer and reused for every subsequent hash, instead of once per
//! call. Built directly on `sha2`'s raw block-compression function, since
//! the `Digest` trait has no way to resume from a mid-stream state.

use generic_array::typenum::U64;
use generic_array::GenericArray;
use sha2::compress256;

const IV: [u32; 8] = [
    0x6a09_e667,
    0xbb67_ae85,
    0x3c6e_f372,
    0xa54f_f53a,
    0x510e_527f,
    0x9b05_688c,
    0x1f83_d9ab,
    0x5be0_cd19,
];

fn block(bytes: &[u8]) -> GenericArray<u8, U64> {
    GenericArray::clone_from_slice(bytes)
}

/// Plain, from-scratch SHA-256, used where no shared prefix is worth
/// snapshotting (e.g. message digests, HMAC).
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut state = IV;
    let mut buf = Vec::with_capacity(data.len() + 9);
    buf.extend_from_slice(data);
    pad(&mut buf, data.len() as u64);
    for chunk in buf.chunks_exact(64) {
        compress256(&mut state, &[block(chunk)]);
    }
    let mut out = [0u8; 32];
    for (o, w) in out.chunks_exact_mut(4).zip(state.iter()) {
        o.copy_from_slice(&w.to_be_bytes());
    }
    out
}

fn pad(buf: &mut Vec<u8>, msg_len: u64) {
    let bit_len = msg_len * 8;
    buf.push(0x80);
    while buf.len() % 64 != 56 {
        buf.push(0);
    }
    buf.extend_from_slice(&bit_len.to_be_bytes());
}

/// The compression state after absorbing exactly one 64-byte block.
#[derive(Clone, Copy)]
pub struct FirstBlock {
    state: [u32; 8],
}

impl FirstBlock {
    /// Zero-pads `prefix` (which must be <= 64 bytes, typically `pk_seed`,
    /// n=24) out to a full block and compresses it.
    pub fn new(prefix: &[u8]) -> Self {
        assert!(prefix.len() <= 64);
        let mut buf = [0u8; 64];
        buf[..prefix.len()].copy_from_slice(prefix);
        let mut state = IV;
        compress256(&mut state, &[block(&buf)]);
        FirstBlock { state }
    }

    /// Hashes `pk_seed_padded(64) || suffix`, truncated to `n` bytes.
    pub fn hash_suffix(&self, suffix: &[u8], n: usize) -> Vec<u8> {
        let mut state = self.state;
        let mut buf = Vec::with_capacity(suffix.len() + 9);
        buf.extend_from_slice(suffix);
        pad(&mut buf, 64 + suffix.len() as u64);
        for chunk in buf.chunks_exact(64) {
            compress256(&mut state, &[block(chunk)]);
        }
        let mut out = Vec::with_capacity(32);
        for w in state.iter() {
            out.extend_from_slice(&w.to_be_bytes());
        }
        out.truncate(n);
        out
    }

    /// Same as `hash_suffix`, but the suffix is supplied as several parts
    /// that are logically concatenated, avoiding an extra allocation at
    /// call sites that already hold the pieces separately.
    pub fn hash_suffix_parts(&self, parts: &[&[u8]], n: usize) -> Vec<u8> {
        let mut joined = Vec::new();
        for p in parts {
            joined.extend_from_slice(p);
        }
        self.hash_suffix(&joined, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_block_matches_plain_hash() {
        let pk_seed = [7u8; 24];
        let suffix = b"hello world, this is a test payload";
        let fb = FirstBlock::new(&pk_seed);
        let mut full = [0u8; 64];
        full[..24].copy_from_slice(&pk_seed);
        let mut direct = full.to_vec();
        direct.extend_from_slice(suffix);
        let expect = sha256(&direct);
        let got = fb.hash_suffix(suffix, 32);
        assert_eq!(&got[..], &expect[..]);
    }

    #[test]
    fn sha256_empty_matches_known_vector() {
        let out = sha256(b"");
        assert_eq!(
            hex(&out),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    fn hex(b: &[u8]) -> String {
        b.iter().map(|x| format!("{:02x}", x)).collect()
    }
}
