//! Core types shared across the candymint run.

use serde::{Deserialize, Serialize};

/// One mint loop iteration, recorded whether or not the transaction landed.
///
/// Appended to an in-memory list during the run and flushed to
/// `mint_result_<timestamp>.json` when the loop exits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintAttempt {
    pub index: u64,
    pub success: bool,
    /// Transaction signature, absent when the attempt failed or was skipped.
    pub tx: Option<String>,
}

impl MintAttempt {
    pub fn succeeded(index: u64, tx: String) -> Self {
        Self {
            index,
            success: true,
            tx: Some(tx),
        }
    }

    pub fn failed(index: u64) -> Self {
        Self {
            index,
            success: false,
            tx: None,
        }
    }
}

/// One NFT descriptor read from an asset JSON file.
///
/// Only `name` is required; the upload step attaches the URI from the
/// caller-supplied template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataItem {
    pub name: String,
}

/// Point-in-time reading of the payer wallet's funds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSample {
    pub lamports: u64,
    pub sol: f64,
    /// Unix timestamp in milliseconds.
    pub at: i64,
}

impl BalanceSample {
    pub fn new(lamports: u64) -> Self {
        Self {
            lamports,
            sol: lamports as f64 / solana_sdk::native_token::LAMPORTS_PER_SOL as f64,
            at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
