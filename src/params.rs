//! Fixed parameters for the one supported SPHINCS+/LMS configuration
//! (SHA-256, n=24, SPHINCS+-192s-simple). See `config.rs` for the handful
//! of knobs that remain runtime-selectable.

/// Hash output length in bytes for every primitive in this crate.
pub const N: usize = 24;

/// LMS tree height (logical; some top levels may be faked, see `Config`).
pub const LMS_H: usize = 20;

/// Leaves built per `step_next` call while in `BuildState::DoLms`, fixed
/// regardless of `SpeedSetting` (unlike the hypertree Merkle builder's
/// per-step pace, see `Config::merkle_chains_per_iter`).
pub const LMS_LEAF_PER_ITER: usize = 2;

/// LM-OTS (W=4, "slow") parameters.
pub const LM_OTS_W4_PARAM_ID: u32 = 0xe000_0023;
pub const LM_OTS_W4_W: u32 = 4;
pub const LM_OTS_W4_P: usize = 51;
pub const LM_OTS_W4_LS: u32 = 4;

/// LM-OTS (W=2, "fast") parameters.
pub const LM_OTS_W2_PARAM_ID: u32 = 0xe000_0022;
pub const LM_OTS_W2_W: u32 = 2;
pub const LM_OTS_W2_P: usize = 101;
pub const LM_OTS_W2_LS: u32 = 6;

pub const LMS_TREE_PARAM_ID: u32 = 0xe000_0028;

/// LM-OTS domain separation tags (the single `D` byte of each prefix).
pub const D_PBLC: u8 = 0x80;
pub const D_MESG: u8 = 0x81;
pub const D_LEAF: u8 = 0x82;
pub const D_INTR: u8 = 0x83;

/// SPHINCS+-192s-simple parameters.
pub const SPH_K: usize = 14;
pub const SPH_A: usize = 16;
pub const SPH_H: usize = 64;
pub const SPH_D: usize = 8;
pub const SPH_T: usize = SPH_H / SPH_D;
/// WOTS+ chain count used inside the hypertree; always W=4 geometry,
/// independent of the LMS `SpeedSetting` (which only governs LMS itself).
pub const SPH_WOTS_LEN: usize = 51;
pub const SPH_DLEN: usize = SPH_D * SPH_WOTS_LEN;

pub const LEN_PUBKEY_192: usize = 4 + 2 * N;
pub const LEN_PRIVKEY_192: usize = 4 + 4 * N;
pub const LEN_LMS_PUBLIC_KEY: usize = 4 + 4 + 4 + 16 + N;
pub const LEN_SPHINCS_SIG: usize = N * (1 + SPH_K * (SPH_A + 1) + (SPH_H + SPH_DLEN));

pub const LEN_SIG_192_SLOW: usize = LEN_SPHINCS_SIG + LEN_LMS_PUBLIC_KEY + 1744;
pub const LEN_SIG_192_FAST: usize = LEN_SPHINCS_SIG + LEN_LMS_PUBLIC_KEY + 2944;

/// WOTS+/FORS tweakable-hash address types (ADR `type` field, §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AdrType {
    WotsHash = 0,
    WotsPkCompress = 1,
    HashTree = 2,
    ForsTree = 3,
    ForsRootCompress = 4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_signature_lengths_match_component_sizes() {
        assert_eq!(LEN_SPHINCS_SIG, N * (1 + SPH_K * (SPH_A + 1) + (SPH_H + SPH_DLEN)));
        assert_eq!(LEN_SIG_192_SLOW, LEN_SPHINCS_SIG + LEN_LMS_PUBLIC_KEY + 1744);
        assert_eq!(LEN_SIG_192_FAST, LEN_SPHINCS_SIG + LEN_LMS_PUBLIC_KEY + 2944);
        assert!(LEN_SIG_192_SLOW < LEN_SIG_192_FAST);
    }

    #[test]
    fn lm_ots_param_ids_are_distinct() {
        assert_ne!(LM_OTS_W4_PARAM_ID, LM_OTS_W2_PARAM_ID);
        assert_ne!(LM_OTS_W4_PARAM_ID, LMS_TREE_PARAM_ID);
    }

    #[test]
    fn domain_separation_tags_are_distinct() {
        let tags = [D_PBLC, D_MESG, D_LEAF, D_INTR];
        for (i, a) in tags.iter().enumerate() {
            for (j, b) in tags.iter().enumerate() {
                assert!(i == j || a != b);
            }
        }
    }
}
