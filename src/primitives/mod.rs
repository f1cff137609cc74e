pub mod hmac_drbg;
pub mod sha256;

pub use hmac_drbg::{hmac_sha256, HmacDrbg, RandFn};
pub use sha256::{sha256, FirstBlock};
