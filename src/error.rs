//! Error taxonomy for the candymint run lifecycle.
//!
//! Only `Config` and `Discovery` are fatal: they abort the run before or
//! during setup. Everything that happens per-probe, per-batch or per-attempt
//! is caught at its own scope and folded into a result record instead of
//! being propagated.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid run parameters. Aborts before any network activity.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// No scraped candidate resolved to a live candy machine account.
    #[error("no candy machine found among {probed} candidate(s)")]
    Discovery { probed: usize },

    /// An RPC round-trip failed. Recovered at probe/batch/attempt scope.
    #[error("chain error: {0}")]
    Chain(String),

    #[error("mint site fetch failed: {0}")]
    Fetch(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Fatal errors terminate the process; everything else is folded into
    /// result records by the component that observed it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Discovery { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_config_and_discovery_are_fatal() {
        assert!(Error::Config("missing cluster".into()).is_fatal());
        assert!(Error::Discovery { probed: 12 }.is_fatal());
        assert!(!Error::Chain("rpc timeout".into()).is_fatal());
        assert!(!Error::Fetch("503".into()).is_fatal());
    }
}
