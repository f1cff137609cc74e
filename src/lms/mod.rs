pub mod ots;
pub mod tree;
