//! The hybrid signer, §4.10-4.11. Holds one "current" LMS tree used to
//! issue per-message signatures, and incrementally builds a "next" LMS
//! tree plus the SPHINCS+ signature that vouches for it, one bounded
//! `step_next` per call to `sign`, so that by the time "current" runs out
//! of leaves its replacement is already armed.

use tracing::{error, info, warn};

use crate::config::{Config, FaultStrategy};
use crate::error::{Error, Result};
use crate::fors::{self, ForsTreeBuilder};
use crate::keygen::{PublicKey, SecretKey};
use crate::lms::ots;
use crate::lms::tree::{self as lms_tree, LmsTreeBuilder};
use crate::merkle::MerkleBuilder;
use crate::params::{
    LEN_SIG_192_FAST, LEN_SIG_192_SLOW, LEN_SPHINCS_SIG, LMS_LEAF_PER_ITER, LMS_TREE_PARAM_ID, N,
    SPH_D, SPH_K, SPH_T,
};
use crate::prf::PrivateKeyGenerator;
use crate::primitives::{hmac_sha256, FirstBlock, HmacDrbg, RandFn};
use crate::tweak::{compute_digest_index, DigestIndex, Tweak};
use crate::wots;

fn target_leaf(md: [u8; 2]) -> u32 {
    u16::from_be_bytes(md) as u32
}

/// Compares `expected` against a fresh, independent recomputation,
/// redundantly if `fault_strategy` calls for it, to defend against the
/// hash-fault forgery of eprint 2018/102. Scoped to exactly the three
/// computations that defense covers: each FORS-root computation,
/// FORS-root-compression, and a hypertree Merkle root -- LM-OTS/WOTS+
/// signatures themselves are not redundantly computed. A free function
/// (not a `Signer` method) so callers can hold an outstanding borrow of
/// `self.pre` (via `Tweak`) in `recompute` while still passing `&mut
/// self.fatal` alongside it.
fn fault_check(
    fault_strategy: FaultStrategy,
    fatal: &mut bool,
    where_: &'static str,
    expected: &[u8],
    recompute: impl Fn() -> Vec<u8>,
) -> Result<()> {
    if fault_strategy == FaultStrategy::None {
        return Ok(());
    }

    let mut attempt = recompute();
    let mut retries = 0;
    while attempt != expected {
        match fault_strategy {
            FaultStrategy::Fatal => {
                *fatal = true;
                error!(where_, "redundant computation mismatch, latching fatal error");
                return Err(Error::FaultMismatch { where_ });
            }
            FaultStrategy::Restart => {
                retries += 1;
                if retries >= 3 {
                    *fatal = true;
                    error!(where_, retries, "computation would not settle, giving up");
                    return Err(Error::FaultMismatch { where_ });
                }
                warn!(where_, retries, "redundant computation mismatch, restarting");
                attempt = recompute();
            }
            FaultStrategy::None => unreachable!(),
        }
    }
    Ok(())
}

/// The armed LMS tree a `Signer` signs actual messages under: a fully
/// built tree, its DRBG-faked upper levels, the assembled 52-byte LMS
/// public key, and the SPHINCS+ signature over that public key.
struct ArmedLms {
    i16: [u8; 16],
    tree: LmsTreeBuilder,
    fake_path: Vec<Vec<u8>>,
    pub_bytes: Vec<u8>,
    sphincs_sig: Vec<u8>,
    next_leaf: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildState {
    Init,
    DoLms,
    LmsFinished,
    Fors,
    CompleteFors,
    Hypertree,
}

/// Scratch space for the background build of the next `ArmedLms`. Kept
/// flat rather than as data carried on `BuildState` variants -- every
/// field here maps directly onto a field of the legacy build-context
/// struct this state machine replaces.
struct BuildScratch {
    state: BuildState,
    i16: [u8; 16],
    lms: Option<LmsTreeBuilder>,
    fake_path: Vec<Vec<u8>>,
    pub_bytes: Option<Vec<u8>>,
    r: Option<Vec<u8>>,
    digest: Option<DigestIndex>,
    fors_prefix: Vec<u8>,
    fors_tree_idx: usize,
    fors_builder: Option<ForsTreeBuilder>,
    fors_roots: Vec<Vec<u8>>,
    fors_reveals: Vec<Vec<u8>>,
    fors_paths: Vec<Vec<Vec<u8>>>,
    idx_tree: u64,
    idx_leaf: u32,
    hyper_layer: usize,
    hyper_message: Vec<u8>,
    hyper_builder: Option<MerkleBuilder>,
    hyper_wots_sigs: Vec<Vec<Vec<u8>>>,
    hyper_auth_paths: Vec<Vec<Vec<u8>>>,
    ready: Option<ArmedLms>,
}

impl BuildScratch {
    fn new() -> Self {
        BuildScratch {
            state: BuildState::Init,
            i16: [0u8; 16],
            lms: None,
            fake_path: Vec::new(),
            pub_bytes: None,
            r: None,
            digest: None,
            fors_prefix: Vec::new(),
            fors_tree_idx: 0,
            fors_builder: None,
            fors_roots: Vec::with_capacity(SPH_K),
            fors_reveals: Vec::with_capacity(SPH_K),
            fors_paths: Vec::with_capacity(SPH_K),
            idx_tree: 0,
            idx_leaf: 0,
            hyper_layer: 0,
            hyper_message: Vec::new(),
            hyper_builder: None,
            hyper_wots_sigs: Vec::with_capacity(SPH_D),
            hyper_auth_paths: Vec::with_capacity(SPH_D),
            ready: None,
        }
    }
}

/// A loaded hybrid signer. See module docs for the rotation scheme.
pub struct Signer {
    cfg: Config,
    sk: SecretKey,
    pre: FirstBlock,
    drbg: HmacDrbg,
    current: Option<ArmedLms>,
    scratch: BuildScratch,
    fatal: bool,
}

impl Signer {
    /// Loads `sk` under `cfg`, seeding the internal DRBG from `do_rand`
    /// and synchronously building the first armed LMS/SPHINCS+ tree --
    /// there is no prior signer whose idle cycles could have built it in
    /// the background, so this call does the equivalent of the first
    /// several thousand `step_next` calls up front.
    pub fn load(sk: SecretKey, cfg: Config, do_rand: RandFn) -> Result<Self> {
        let drbg = HmacDrbg::seed(do_rand)?;
        let pre = FirstBlock::new(&sk.pk_seed);
        let mut signer = Signer {
            cfg,
            sk,
            pre,
            drbg,
            current: None,
            scratch: BuildScratch::new(),
            fatal: false,
        };
        while signer.scratch.ready.is_none() {
            signer.step_next()?;
        }
        signer.current = signer.scratch.ready.take();
        signer.scratch = BuildScratch::new();
        info!("signer loaded, first LMS/SPHINCS+ tree armed");
        Ok(signer)
    }

    /// The outer SPHINCS+ public key this signer's signatures verify
    /// against. Fixed for the lifetime of the secret key, unlike the LMS
    /// public key embedded in each signature, which rotates.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            param: self.sk.param,
            pk_seed: self.sk.pk_seed,
            pk_root: self.sk.pk_root,
        }
    }

    /// Signs `message`, producing the wire-format hybrid signature of
    /// §4.11. Also advances the background build of the next LMS tree by
    /// one bounded step, and rotates if the current tree is exhausted.
    pub fn sign(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        if self.fatal {
            return Err(Error::Fatal);
        }
        if self.current.is_none() {
            return Err(Error::NotInitialized);
        }

        let exhausted = {
            let current = self.current.as_ref().expect("checked above");
            current.next_leaf >= current.tree.total_leaves()
        };
        if exhausted {
            self.rotate()?;
        }

        let leaf = self.current.as_ref().expect("checked above").next_leaf;

        let mut randomizer = vec![0u8; N];
        self.drbg.generate(&mut randomizer)?;

        let current = self.current.as_ref().expect("checked above");
        let ots_sig = ots::sign(current.tree.prf(), &current.i16, leaf, message, randomizer, &self.cfg);
        let ots_bytes = ots_sig.to_bytes(&self.cfg);

        let current = self.current.as_ref().expect("checked above");
        let mut full_path = current
            .tree
            .auth_path(leaf)
            .expect("leaf is within the built tree");
        full_path.extend(current.fake_path.iter().cloned());

        let mut out = Vec::with_capacity(LEN_SIG_192_FAST.max(LEN_SIG_192_SLOW));
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&leaf.to_be_bytes());
        out.extend_from_slice(&ots_bytes);
        out.extend_from_slice(&LMS_TREE_PARAM_ID.to_be_bytes());
        for node in &full_path {
            out.extend_from_slice(node);
        }
        out.extend_from_slice(&current.pub_bytes);
        out.extend_from_slice(&current.sphincs_sig);

        self.current.as_mut().expect("checked above").next_leaf += 1;
        self.step_next()?;
        Ok(out)
    }

    fn rotate(&mut self) -> Result<()> {
        match self.scratch.ready.take() {
            Some(armed) => {
                self.current = Some(armed);
                self.scratch = BuildScratch::new();
                info!("rotated to freshly armed LMS tree");
                Ok(())
            }
            None => {
                self.fatal = true;
                error!("LMS tree exhausted before its replacement finished building");
                Err(Error::Fatal)
            }
        }
    }

    fn step_next(&mut self) -> Result<()> {
        if self.scratch.ready.is_some() {
            return Ok(());
        }
        match self.scratch.state {
            BuildState::Init => self.begin_next_lms(),
            BuildState::DoLms => self.do_lms_step(),
            BuildState::LmsFinished => self.finish_lms_build(),
            BuildState::Fors => self.fors_step(),
            BuildState::CompleteFors => self.finish_fors(),
            BuildState::Hypertree => self.hypertree_step(),
        }
    }

    fn begin_next_lms(&mut self) -> Result<()> {
        let mut i16 = [0u8; 16];
        self.drbg.generate(&mut i16)?;
        let mut seed = [0u8; 32];
        self.drbg.generate(&mut seed)?;

        self.scratch.i16 = i16;
        self.scratch.lms = Some(LmsTreeBuilder::new(i16, &seed, &self.cfg));
        self.scratch.state = BuildState::DoLms;
        Ok(())
    }

    fn do_lms_step(&mut self) -> Result<()> {
        let tree = self.scratch.lms.as_mut().expect("DoLms without a tree");
        if tree.step(LMS_LEAF_PER_ITER, &self.cfg) {
            self.scratch.state = BuildState::LmsFinished;
        }
        Ok(())
    }

    /// Extends the just-completed actual-height root up to the full
    /// logical `LMS_H` with DRBG-drawn fake siblings, assembles the next
    /// LMS public key, and derives the hypertree leaf this build's
    /// SPHINCS+ signature will occupy.
    fn finish_lms_build(&mut self) -> Result<()> {
        let actual_root = self
            .scratch
            .lms
            .as_ref()
            .expect("LmsFinished without a tree")
            .root()
            .expect("tree reports done")
            .to_vec();

        let lms_fake = self.cfg.lms_fake();
        let mut fake_path = Vec::with_capacity(lms_fake);
        for _ in 0..lms_fake {
            let mut sibling = vec![0u8; N];
            self.drbg.generate(&mut sibling)?;
            fake_path.push(sibling);
        }
        // Any real leaf's index has every bit above `lms_actual` clear, so
        // the real subtree is always the left child at every faked level;
        // `root_from_auth_path` already assumes exactly that.
        let full_root = lms_tree::root_from_auth_path(&self.scratch.i16, 0, &actual_root, &fake_path);
        let pub_bytes = lms_tree::public_key_bytes(&self.scratch.i16, &full_root, self.cfg.ots_param_id());

        let mut drbg_r = vec![0u8; N];
        self.drbg.generate(&mut drbg_r)?;
        let r = hmac_sha256(&self.sk.sk_prf, &[&drbg_r, &pub_bytes], N);
        let digest = compute_digest_index(&r, &self.sk.pk_seed, &self.sk.pk_root, &pub_bytes);

        let mut fors_prefix = Vec::with_capacity(12);
        fors_prefix.extend_from_slice(&digest.idx_tree.to_be_bytes());
        fors_prefix.extend_from_slice(&digest.idx_leaf.to_be_bytes());

        self.scratch.idx_tree = digest.idx_tree;
        self.scratch.idx_leaf = digest.idx_leaf;
        self.scratch.fors_builder = Some(ForsTreeBuilder::new(digest.idx_tree, 0, target_leaf(digest.md[0])));
        self.scratch.fors_prefix = fors_prefix;
        self.scratch.digest = Some(digest);
        self.scratch.fake_path = fake_path;
        self.scratch.pub_bytes = Some(pub_bytes);
        self.scratch.r = Some(r);
        self.scratch.fors_tree_idx = 0;
        self.scratch.state = BuildState::Fors;
        Ok(())
    }

    fn fors_step(&mut self) -> Result<()> {
        let tw = Tweak::new(&self.pre);
        let prf = PrivateKeyGenerator::for_config(&self.cfg, &self.sk.sk_seed, &self.scratch.fors_prefix);
        let leaves = self.cfg.fors_leafs_per_iter();

        let done = {
            let builder = self.scratch.fors_builder.as_mut().expect("Fors without a builder");
            builder.step(&tw, &prf, leaves)
        };
        if !done {
            return Ok(());
        }

        let builder = self.scratch.fors_builder.take().expect("just stepped");
        let root = builder.root().expect("done").to_vec();
        let reveal = builder.reveal().expect("target always in tree").to_vec();
        let path = builder.auth_path().expect("auth path captured once done");

        let digest = self.scratch.digest.as_ref().expect("computed in LmsFinished");
        let hyper_tree_idx = digest.idx_tree;
        let tree_num = self.scratch.fors_tree_idx as u32;
        let target = target_leaf(digest.md[self.scratch.fors_tree_idx]);
        fault_check(self.cfg.fault_strategy, &mut self.fatal, "fors_root", &root, || {
            fors::root_from_auth_path(&tw, hyper_tree_idx, tree_num, target, &reveal, &path)
        })?;

        self.scratch.fors_roots.push(root);
        self.scratch.fors_reveals.push(reveal);
        self.scratch.fors_paths.push(path);

        self.scratch.fors_tree_idx += 1;
        if self.scratch.fors_tree_idx >= SPH_K {
            self.scratch.state = BuildState::CompleteFors;
        } else {
            let digest = self.scratch.digest.as_ref().expect("computed in LmsFinished");
            let target = target_leaf(digest.md[self.scratch.fors_tree_idx]);
            self.scratch.fors_builder = Some(ForsTreeBuilder::new(
                digest.idx_tree,
                self.scratch.fors_tree_idx as u32,
                target,
            ));
        }
        Ok(())
    }

    fn finish_fors(&mut self) -> Result<()> {
        let tw = Tweak::new(&self.pre);
        let roots = self.scratch.fors_roots.clone();
        let compressed = fors::compress_roots(&tw, &roots);
        fault_check(
            self.cfg.fault_strategy,
            &mut self.fatal,
            "fors_root_compress",
            &compressed,
            || fors::compress_roots(&tw, &roots),
        )?;
        self.scratch.hyper_message = compressed;
        self.scratch.hyper_layer = 0;

        let prf = PrivateKeyGenerator::for_config(&self.cfg, &self.sk.sk_seed, &self.sk.pk_seed);
        self.scratch.hyper_builder = Some(MerkleBuilder::new(
            prf,
            0,
            self.scratch.idx_tree,
            SPH_T,
            Some(self.scratch.idx_leaf),
        ));
        self.scratch.state = BuildState::Hypertree;
        Ok(())
    }

    fn hypertree_step(&mut self) -> Result<()> {
        let tw = Tweak::new(&self.pre);
        let chains = self.cfg.merkle_chains_per_iter();

        let done = {
            let builder = self.scratch.hyper_builder.as_mut().expect("Hypertree without a builder");
            builder.step(&tw, chains)
        };
        if !done {
            return Ok(());
        }

        let builder = self.scratch.hyper_builder.take().expect("just stepped");
        let root = builder.root().expect("done").to_vec();
        let auth_path: Vec<Vec<u8>> = builder
            .auth_path()
            .iter()
            .map(|n| n.clone().expect("target auth path fully captured"))
            .collect();

        let layer = self.scratch.hyper_layer as u8;
        let tree_idx = self.scratch.idx_tree;
        let cfg = self.cfg;
        let sk_seed = self.sk.sk_seed;
        let pk_seed = self.sk.pk_seed;
        fault_check(
            self.cfg.fault_strategy,
            &mut self.fatal,
            "hypertree_merkle_root",
            &root,
            || {
                let prf = PrivateKeyGenerator::for_config(&cfg, &sk_seed, &pk_seed);
                let mut redundant = MerkleBuilder::new(prf, layer, tree_idx, SPH_T, None);
                while !redundant.step(&tw, SPH_T) {}
                redundant.root().expect("done").to_vec()
            },
        )?;

        let mut message_n = [0u8; N];
        message_n.copy_from_slice(&self.scratch.hyper_message);
        let sign_prf = PrivateKeyGenerator::for_config(&self.cfg, &self.sk.sk_seed, &self.sk.pk_seed);
        let wots_sig = wots::sign(
            &tw,
            &sign_prf,
            self.scratch.hyper_layer as u8,
            self.scratch.idx_tree,
            self.scratch.idx_leaf,
            &message_n,
        );

        self.scratch.hyper_wots_sigs.push(wots_sig);
        self.scratch.hyper_auth_paths.push(auth_path);
        self.scratch.hyper_message = root;
        self.scratch.hyper_layer += 1;

        if self.scratch.hyper_layer >= SPH_D {
            self.finalize_next()
        } else {
            let mask = (1u64 << SPH_T) - 1;
            self.scratch.idx_leaf = (self.scratch.idx_tree & mask) as u32;
            self.scratch.idx_tree >>= SPH_T;
            let next_prf = PrivateKeyGenerator::for_config(&self.cfg, &self.sk.sk_seed, &self.sk.pk_seed);
            self.scratch.hyper_builder = Some(MerkleBuilder::new(
                next_prf,
                self.scratch.hyper_layer as u8,
                self.scratch.idx_tree,
                SPH_T,
                Some(self.scratch.idx_leaf),
            ));
            Ok(())
        }
    }

    fn finalize_next(&mut self) -> Result<()> {
        let mut sig = Vec::with_capacity(LEN_SPHINCS_SIG);
        sig.extend_from_slice(self.scratch.r.as_ref().expect("r drawn in LmsFinished"));
        for k in 0..SPH_K {
            sig.extend_from_slice(&self.scratch.fors_reveals[k]);
            for node in &self.scratch.fors_paths[k] {
                sig.extend_from_slice(node);
            }
        }
        for level in 0..SPH_D {
            for chain_val in &self.scratch.hyper_wots_sigs[level] {
                sig.extend_from_slice(chain_val);
            }
            for node in &self.scratch.hyper_auth_paths[level] {
                sig.extend_from_slice(node);
            }
        }
        debug_assert_eq!(sig.len(), LEN_SPHINCS_SIG);

        let tree = self.scratch.lms.take().expect("lms tree built in DoLms");
        let armed = ArmedLms {
            i16: self.scratch.i16,
            tree,
            fake_path: std::mem::take(&mut self.scratch.fake_path),
            pub_bytes: self.scratch.pub_bytes.take().expect("assembled in LmsFinished"),
            sphincs_sig: sig,
            next_leaf: 0,
        };
        self.scratch.ready = Some(armed);
        Ok(())
    }
}
