//! Trait surfaces for the services the scanner drives but does not own: the
//! distributed task primitive, match history storage, match results
//! providers, and the event registration store.

pub mod error;
pub mod provider;
pub mod registration;
pub mod storage;
pub mod tasks;

pub use error::{ContractError, ContractResult};

/// Frequently used contract imports for scanner and harness crates.
pub mod prelude {
    pub use super::error::{ContractError, ContractResult};
    pub use super::provider::{
        MatchResultsProvider, MatchResultsProviderFactory, ProviderMatches,
    };
    pub use super::registration::RegistrationStore;
    pub use super::storage::{
        MatchHistoryEvent, MatchHistoryStorage, NextPartition, PartitionLock,
        ResultCollection, StalePartition, WritablePlayerResults,
    };
    pub use super::tasks::{
        DetailedInfoRecord, DistributedTask, InfoLevel, InfoValue,
        ParticipantState, ParticipationHandle, TaskManager, TaskRequest,
        TaskWorker, TaskWorkerFactory,
    };
}
