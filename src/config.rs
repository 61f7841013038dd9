//! Run configuration files and wallet key loading.
//!
//! Two JSON documents are involved: the per-run mint config (task name,
//! cluster, candy machine or mint-site URL, wallet key path, mint count,
//! log directory) and the standalone candy machine config produced by the
//! scrape step.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use solana_sdk::signature::Keypair;

use crate::error::{Error, Result};

/// Mint run configuration, read at startup and rewritten after a successful
/// candy machine discovery so later runs skip the scrape step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub name: String,
    pub cluster: String,
    #[serde(default)]
    pub candy_machine: String,
    #[serde(default)]
    pub mint_url: String,
    pub wallet_priv_key: PathBuf,
    /// `-1` means unbounded minting.
    pub mint_count: i64,
    pub logs_dir: PathBuf,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Trim and validate run parameters. Anything wrong here is fatal and
    /// reported before any network activity.
    pub fn validate(&mut self) -> Result<()> {
        self.candy_machine = self.candy_machine.trim().to_string();
        self.mint_url = self.mint_url.trim().to_string();

        if self.candy_machine.is_empty() && self.mint_url.is_empty() {
            return Err(Error::Config(
                "require a candy machine address or a mint site url".into(),
            ));
        }
        if self.candy_machine.contains(' ') || self.mint_url.contains(' ') {
            return Err(Error::Config(
                "candyMachine and mintUrl must not contain spaces".into(),
            ));
        }
        if self.cluster.trim().is_empty() {
            return Err(Error::Config("require a solana cluster".into()));
        }
        if !self.candy_machine.is_empty()
            && !(40..=50).contains(&self.candy_machine.len())
        {
            return Err(Error::Config(format!(
                "'{}' is not a valid candy machine address",
                self.candy_machine
            )));
        }
        if !self.mint_url.is_empty()
            && !self.mint_url.starts_with("http://")
            && !self.mint_url.starts_with("https://")
        {
            return Err(Error::Config(
                "mintUrl must start with http:// or https://".into(),
            ));
        }
        Ok(())
    }

    pub fn unbounded(&self) -> bool {
        self.mint_count < 0
    }
}

/// Standalone candy machine config saved by the scrape step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandyFileConfig {
    #[serde(rename = "CANDY_MACHINE_PROGRAM_UUID")]
    pub uuid: String,
    #[serde(rename = "CANDY_MACHINE_PROGRAM_CONFIG")]
    pub config: String,
    #[serde(rename = "CONNECTION_NETWORK")]
    pub network: String,
}

impl CandyFileConfig {
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Map a cluster name to its public RPC endpoint.
pub fn cluster_url(cluster: &str) -> Result<String> {
    match cluster {
        "mainnet-beta" => Ok("https://api.mainnet-beta.solana.com".to_string()),
        "testnet" => Ok("https://api.testnet.solana.com".to_string()),
        "devnet" => Ok("https://api.devnet.solana.com".to_string()),
        other if other.starts_with("http://") || other.starts_with("https://") => {
            Ok(other.to_string())
        }
        other => Err(Error::Config(format!("unknown cluster '{}'", other))),
    }
}

/// Load a wallet keypair from the JSON byte-array format used by the solana
/// CLI tooling.
pub fn load_keypair(path: &Path) -> Result<Keypair> {
    let raw = fs::read_to_string(path)?;
    let bytes: Vec<u8> = serde_json::from_str(&raw)?;
    Keypair::from_bytes(&bytes)
        .map_err(|e| Error::Config(format!("invalid wallet key file {}: {}", path.display(), e)))
}
