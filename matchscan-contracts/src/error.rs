use thiserror::Error;

/// Failures reported by external collaborators.
///
/// Only [`ContractError::Network`] and [`ContractError::Storage`] describe
/// transient service faults; every other variant signals a condition retrying
/// will not fix.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContractError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("storage service failure: {0}")]
    Storage(String),

    #[error("partition lease has expired")]
    LeaseExpired,

    #[error("task is over and no longer accepts participants")]
    TaskIsOver,

    /// The remote side refused the request in a way that needs an operator.
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ContractError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ContractError::Network(_) | ContractError::Storage(_))
    }
}

pub type ContractResult<T> = std::result::Result<T, ContractError>;
