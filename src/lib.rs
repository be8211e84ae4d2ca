pub mod error;
pub mod math;
pub mod paillier;
pub mod zkp;
pub mod ballot;
pub mod serde_support;