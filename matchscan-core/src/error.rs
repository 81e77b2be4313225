use matchscan_contracts::ContractError;
use matchscan_model::{EventId, MatchOrdering, ModelError};
use thiserror::Error;

use crate::merge::MergeError;

#[derive(Debug, Clone, Error)]
pub enum ScanError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("invalid scan task parameters: {0}")]
    Model(#[from] ModelError),

    #[error("match merge failed: {0}")]
    Merge(#[from] MergeError),

    #[error(
        "results provider returned matches {0:?}; only most recently played first is supported"
    )]
    UnsupportedOrdering(MatchOrdering),

    #[error("the test scan for event {event_id} by worker {worker} has run too long")]
    TestScanRanLong { event_id: EventId, worker: String },

    #[error("single-pass scan for event {0} carries no scan start time")]
    MissingScanStart(EventId),

    #[error("this coordinator already has a running scan worker")]
    WorkerAlreadyActive,

    #[error("the scan worker being ended is not the active scan worker")]
    WorkerMismatch,
}

impl ScanError {
    /// Whether the failure must end the scan.
    ///
    /// Only recognized transient network and storage faults, and merges that
    /// are confined to one player, are absorbed by the caller.
    pub fn is_critical(&self) -> bool {
        match self {
            ScanError::Contract(err) => !err.is_transient(),
            ScanError::Merge(err) => err.is_critical(),
            _ => true,
        }
    }

    pub fn is_lease_expired(&self) -> bool {
        matches!(self, ScanError::Contract(ContractError::LeaseExpired))
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
