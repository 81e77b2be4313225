use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::TimeDelta;
use matchscan_model::{CollectionId, EventId, MatchResult, PartitionId, PlayerId};

use crate::error::ContractResult;

/// Entry point of the match history storage engine.
#[async_trait]
pub trait MatchHistoryStorage: Send + Sync {
    async fn get_event(
        &self,
        event_id: &EventId,
    ) -> ContractResult<Arc<dyn MatchHistoryEvent>>;
}

#[async_trait]
pub trait MatchHistoryEvent: Send + Sync {
    fn event_id(&self) -> &EventId;

    async fn result_collection(
        &self,
        collection_id: &CollectionId,
    ) -> ContractResult<Arc<dyn ResultCollection>>;
}

/// A result collection is split into player partitions that are handed out
/// under a lease once they grow staler than the requested threshold.
#[async_trait]
pub trait ResultCollection: Send + Sync {
    async fn next_player_collection_for_update(
        &self,
        stale_threshold: TimeDelta,
        lease_duration: TimeDelta,
    ) -> ContractResult<NextPartition>;
}

/// Outcome of asking storage for the next stale partition.
#[derive(Debug)]
pub enum NextPartition {
    /// A partition is leased to the caller until the lock is released.
    Stale(StalePartition),
    /// Nothing is stale yet; the earliest partition turns stale after the
    /// given wait.
    NoneStale { time_til_next_update: TimeDelta },
}

pub struct StalePartition {
    pub partition_id: PartitionId,
    pub players: Vec<Arc<dyn WritablePlayerResults>>,
    pub lock: Box<dyn PartitionLock>,
}

impl fmt::Debug for StalePartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StalePartition")
            .field("partition_id", &self.partition_id)
            .field("players", &self.players.len())
            .finish_non_exhaustive()
    }
}

/// Lease over a partition. The partition's running win total is persisted
/// when the lock is released.
#[async_trait]
pub trait PartitionLock: Send + Sync {
    fn add_wins(&mut self, wins: u64);

    async fn release(&mut self) -> ContractResult<()>;
}

/// One player's stored match history inside a leased partition.
///
/// Operations fail with [`crate::ContractError::LeaseExpired`] once the
/// partition lease is gone.
#[async_trait]
pub trait WritablePlayerResults: Send + Sync {
    fn player_id(&self) -> &PlayerId;

    /// Player identifier understood by the results provider.
    fn results_token(&self) -> &str;

    fn continuation_token(&self) -> Option<String>;

    fn error_count(&self) -> u32;

    /// Most recent stored matches, most recently played first.
    async fn get_matches(&self, max_count: u32)
    -> ContractResult<Vec<MatchResult>>;

    /// Stores `new_matches` and the provider cursor in one flush.
    async fn add_matches_and_flush(
        &self,
        new_matches: &[MatchResult],
        continuation_token: Option<&str>,
        win_delta: u32,
    ) -> ContractResult<()>;

    async fn update_error_count(&self, error_count: u32)
    -> ContractResult<()>;
}
