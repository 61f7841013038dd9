//! Candidate resolution: which scraped string is the real candy machine?
//!
//! The scanner has no way to tell locally, so every candidate is probed
//! against the chain in parallel and the first one whose derived candy
//! machine account exists wins. Stragglers are aborted and their outcomes
//! discarded; zero successes is a fatal discovery failure.

use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use tokio::task::JoinSet;
use tracing::debug;

use crate::candy::{derive_candy_machine, uuid_of, CandyState};
use crate::chain::ChainClient;
use crate::error::{Error, Result};

/// A candidate proven to correspond to a live candy machine account.
/// Immutable once created; at most one is produced per run.
#[derive(Debug, Clone)]
pub struct ResolvedContract {
    /// The config account address as scraped.
    pub address: String,
    /// First six characters of the address.
    pub uuid: String,
    pub config: Pubkey,
    /// Derived candy machine PDA.
    pub candy_machine: Pubkey,
    pub state: CandyState,
}

/// Probe one candidate: parse, derive, fetch. Any failure along the way
/// just means this string was not the candy machine.
pub async fn probe_candidate(client: &dyn ChainClient, candidate: &str) -> Result<ResolvedContract> {
    let config = candidate
        .parse::<Pubkey>()
        .map_err(|e| Error::Chain(format!("'{}' is not a pubkey: {}", candidate, e)))?;
    let uuid = uuid_of(candidate);
    let (candy_machine, _bump) = derive_candy_machine(&config, &uuid);
    let state = client.fetch_candy_state(&candy_machine).await?;
    Ok(ResolvedContract {
        address: candidate.to_string(),
        uuid,
        config,
        candy_machine,
        state,
    })
}

/// Race all candidates against the chain; first success wins.
pub async fn resolve_candidates<I>(
    client: Arc<dyn ChainClient>,
    candidates: I,
) -> Result<ResolvedContract>
where
    I: IntoIterator<Item = String>,
{
    let mut probes = JoinSet::new();
    let mut probed = 0usize;
    for candidate in candidates {
        let client = Arc::clone(&client);
        probes.spawn(async move { probe_candidate(client.as_ref(), &candidate).await });
        probed += 1;
    }

    while let Some(joined) = probes.join_next().await {
        match joined {
            Ok(Ok(resolved)) => {
                debug!("candidate {} resolved, aborting remaining probes", resolved.address);
                probes.abort_all();
                return Ok(resolved);
            }
            Ok(Err(err)) => debug!("probe failed: {}", err),
            Err(join_err) => debug!("probe task aborted: {}", join_err),
        }
    }
    Err(Error::Discovery { probed })
}
