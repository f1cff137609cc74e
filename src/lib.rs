//! A hybrid post-quantum signature scheme: a stateful LMS Merkle tree
//! signs messages cheaply and at high volume, while a stateless
//! SPHINCS+ keypair periodically signs each fresh LMS public key,
//! binding the two together as the LMS tree rotates. See `signer` for
//! the incremental build that keeps a replacement LMS tree ready ahead
//! of need, and `verify` for the standalone verifier.

pub mod adr;
pub mod config;
pub mod error;
pub mod fors;
pub mod keygen;
pub mod lms;
pub mod merkle;
pub mod params;
pub mod prf;
pub mod primitives;
pub mod signer;
pub mod tweak;
pub mod verify;
pub mod wots;

pub use config::{Config, FaultStrategy, KeygenStrategy, SpeedSetting};
pub use error::{Error, Result};
pub use keygen::{keygen, PublicKey, SecretKey};
pub use primitives::RandFn;
pub use signer::Signer;
pub use verify::verify;
