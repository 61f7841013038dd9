//! candymint - Solana candy machine automation CLI
//!
//! This crate automates the lifecycle of a candy machine mint: initializing
//! the machine, uploading metadata config lines in batches, discovering a
//! machine's config address from a mint-site bundle, and driving mint
//! transactions in a loop with a balance safety check.

pub mod candy;
pub mod chain;
pub mod config;
pub mod error;
pub mod logs;
pub mod minter;
pub mod scrape;
pub mod types;

// Re-export main types for convenience
pub use candy::resolver::ResolvedContract;
pub use error::{Error, Result};
pub use types::{BalanceSample, MetadataItem, MintAttempt};
