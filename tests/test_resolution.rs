//! Candidate resolution against an in-memory chain.
//!
//! Exercises the first-success race: the one real config address wins and
//! failed probes never surface as partial results.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Keypair};

use candymint::candy::resolver::resolve_candidates;
use candymint::candy::{derive_candy_machine, uuid_of, CandyState};
use candymint::chain::ChainClient;
use candymint::error::Error;

/// A chain that only knows about a fixed set of candy machine accounts.
struct MockChain {
    machines: HashSet<Pubkey>,
    wallet: Pubkey,
}

impl MockChain {
    fn with_machine_for(config_address: &str) -> Self {
        let config: Pubkey = config_address.parse().unwrap();
        let (machine, _) = derive_candy_machine(&config, &uuid_of(config_address));
        Self {
            machines: HashSet::from([machine]),
            wallet: Pubkey::new_unique(),
        }
    }

    fn empty() -> Self {
        Self {
            machines: HashSet::new(),
            wallet: Pubkey::new_unique(),
        }
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn fetch_candy_state(&self, candy_machine: &Pubkey) -> Result<CandyState, Error> {
        if self.machines.contains(candy_machine) {
            Ok(CandyState {
                authority: Pubkey::new_unique(),
                wallet: self.wallet,
                data_len: 713,
            })
        } else {
            Err(Error::Chain("AccountNotFound".into()))
        }
    }

    async fn submit_transaction(
        &self,
        _instructions: &[Instruction],
        _payer: &Pubkey,
        _signers: &[&Keypair],
    ) -> Result<String, Error> {
        Err(Error::Chain("submit not supported in this mock".into()))
    }

    async fn balance(&self, _address: &Pubkey) -> Result<u64, Error> {
        Ok(0)
    }

    async fn minimum_rent(&self, _data_len: usize) -> Result<u64, Error> {
        Ok(0)
    }
}

fn noise_candidates() -> Vec<String> {
    vec![
        // Valid pubkeys with no account behind them.
        Pubkey::new_unique().to_string(),
        Pubkey::new_unique().to_string(),
        // Not a pubkey at all.
        "abcDEF1234567890abcDEF1234567890abcDEFg1".to_string(),
    ]
}

#[tokio::test]
async fn resolves_the_single_real_candidate() {
    let real = Pubkey::new_unique().to_string();
    let chain = Arc::new(MockChain::with_machine_for(&real));

    let mut candidates = noise_candidates();
    candidates.push(real.clone());

    let resolved = resolve_candidates(chain.clone(), candidates).await.unwrap();
    assert_eq!(resolved.address, real);
    assert_eq!(resolved.config.to_string(), real);
    assert_eq!(resolved.state.wallet, chain.wallet);
}

#[tokio::test]
async fn resolved_uuid_recomputes_from_address() {
    let real = Pubkey::new_unique().to_string();
    let chain = Arc::new(MockChain::with_machine_for(&real));

    let resolved = resolve_candidates(chain, vec![real.clone()]).await.unwrap();
    assert_eq!(resolved.uuid, uuid_of(&resolved.address));
    assert_eq!(resolved.uuid.len(), 6);
    let (machine, _) = derive_candy_machine(&resolved.config, &resolved.uuid);
    assert_eq!(machine, resolved.candy_machine);
}

#[tokio::test]
async fn all_failures_report_discovery_error() {
    let chain = Arc::new(MockChain::empty());
    let candidates = noise_candidates();
    let total = candidates.len();

    let err = resolve_candidates(chain, candidates).await.unwrap_err();
    match err {
        Error::Discovery { probed } => assert_eq!(probed, total),
        other => panic!("expected Discovery error, got {}", other),
    }
}

#[tokio::test]
async fn empty_candidate_set_is_a_discovery_failure() {
    let chain = Arc::new(MockChain::empty());
    let err = resolve_candidates(chain, Vec::new()).await.unwrap_err();
    assert!(matches!(err, Error::Discovery { probed: 0 }));
}
