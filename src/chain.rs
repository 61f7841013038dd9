//! Chain client seam.
//!
//! Everything that crosses the network goes through the [`ChainClient`]
//! trait so the resolver, uploader and mint loop can be exercised against an
//! in-memory chain in tests. The production implementation wraps the
//! nonblocking solana RPC client.

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::Keypair,
    transaction::Transaction,
};
use tracing::debug;

use crate::candy::CandyState;
use crate::config::cluster_url;
use crate::error::{Error, Result};

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fetch and validate a candy machine account at `candy_machine`.
    async fn fetch_candy_state(&self, candy_machine: &Pubkey) -> Result<CandyState>;

    /// Sign and submit one transaction, returning its signature.
    async fn submit_transaction(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        signers: &[&Keypair],
    ) -> Result<String>;

    /// Current balance of `address` in lamports.
    async fn balance(&self, address: &Pubkey) -> Result<u64>;

    /// Rent-exempt minimum for an account of `data_len` bytes.
    async fn minimum_rent(&self, data_len: usize) -> Result<u64>;
}

/// Production client backed by a solana RPC endpoint.
pub struct RpcChainClient {
    rpc: RpcClient,
}

impl RpcChainClient {
    pub fn connect(cluster: &str) -> Result<Self> {
        let url = cluster_url(cluster)?;
        debug!("connecting to cluster {} ({})", cluster, url);
        Ok(Self {
            rpc: RpcClient::new_with_commitment(url, CommitmentConfig::confirmed()),
        })
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn fetch_candy_state(&self, candy_machine: &Pubkey) -> Result<CandyState> {
        let account = self
            .rpc
            .get_account(candy_machine)
            .await
            .map_err(|e| Error::Chain(e.to_string()))?;
        CandyState::try_from_account_data(&account.data)
    }

    async fn submit_transaction(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        signers: &[&Keypair],
    ) -> Result<String> {
        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| Error::Chain(e.to_string()))?;
        let tx = Transaction::new_signed_with_payer(instructions, Some(payer), signers, blockhash);
        let signature = self
            .rpc
            .send_and_confirm_transaction(&tx)
            .await
            .map_err(|e| Error::Chain(e.to_string()))?;
        Ok(signature.to_string())
    }

    async fn balance(&self, address: &Pubkey) -> Result<u64> {
        self.rpc
            .get_balance(address)
            .await
            .map_err(|e| Error::Chain(e.to_string()))
    }

    async fn minimum_rent(&self, data_len: usize) -> Result<u64> {
        self.rpc
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(|e| Error::Chain(e.to_string()))
    }
}
