//! Cycle-level error taxonomy.

use thiserror::Error;

use cpapwatch_adapters::FetchError;
use cpapwatch_sdk::SinkError;

use crate::store::StoreError;

/// Why one account's poll cycle failed.
///
/// Caught at the cycle boundary by the [`Poller`](crate::Poller); the next
/// interval is the retry.
#[derive(Debug, Error)]
pub enum CycleError {
    /// The snapshot client failed to connect, fetch or decode.
    #[error("failed to fetch snapshot")]
    Fetch(#[from] FetchError),

    /// A persistence operation failed.
    #[error("store unavailable")]
    StoreUnavailable(#[from] StoreError),

    /// The metrics sink rejected a value.
    #[error("failed to project metrics")]
    Projection(#[from] SinkError),
}

impl CycleError {
    /// The error and all of its sources, joined with `: `.
    pub fn chain(&self) -> String {
        chain(self)
    }
}

pub(crate) fn chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(err) = source {
        out.push_str(": ");
        out.push_str(&err.to_string());
        source = err.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_source_chain_is_kept() {
        let err = CycleError::from(FetchError::Timeout);
        assert_eq!(err.to_string(), "failed to fetch snapshot");
        assert_eq!(err.source().unwrap().to_string(), "Request timed out");

        let err = CycleError::from(StoreError::Unavailable("down".into()));
        assert!(matches!(err, CycleError::StoreUnavailable(_)));
        assert_eq!(err.chain(), "store unavailable: backend unavailable: down");
    }
}
