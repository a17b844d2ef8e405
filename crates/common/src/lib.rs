//! Shared building blocks for the account panel crates: logging setup,
//! runtime directory checks and small wire types used by more than one crate.

pub mod env;
pub mod types;
pub mod utils;
