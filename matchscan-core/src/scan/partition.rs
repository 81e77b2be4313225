//! Refresh of the next stale partition.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::TimeDelta;
use futures::{StreamExt, TryStreamExt, stream};
use matchscan_contracts::{
    storage::{NextPartition, StalePartition},
    tasks::InfoLevel,
};
use tokio::time::Instant;

use super::context::ScanContext;
use super::phase;
use super::stats::{PartitionCounters, PartitionUpdateResult};
use crate::error::{Result, ScanError};

impl ScanContext {
    /// Leases the stalest partition and updates every player in it.
    ///
    /// The returned wait is `None` once a single-pass scan, or an official
    /// scan past the event end, finds nothing stale.
    pub(crate) async fn refresh_next_partition(
        &self,
    ) -> Result<PartitionUpdateResult> {
        self.set_app_state("Searching for stale partitions").await;

        let started = Instant::now();
        let mut result = PartitionUpdateResult::default();

        let threshold = phase::stale_threshold(&self.traits, self.clock.now())?;
        tracing::debug!(
            target: "scan::partition",
            worker = %self.worker_id,
            threshold_secs = threshold.num_seconds(),
            "looking for a stale partition"
        );

        let lookup_started = Instant::now();
        let next = self
            .collection
            .next_player_collection_for_update(
                threshold,
                self.settings.partition_lease(),
            )
            .await?;
        result.get_partition_duration = lookup_started.elapsed();

        match next {
            NextPartition::NoneStale {
                time_til_next_update,
            } => {
                if self.traits.scan_type.is_single_pass()
                    || self.clock.now() > self.traits.event_end
                {
                    tracing::info!(
                        target: "scan::partition",
                        worker = %self.worker_id,
                        "no stale partitions left, the scan is over"
                    );
                    result.time_til_next_update = None;
                } else {
                    tracing::debug!(
                        target: "scan::partition",
                        worker = %self.worker_id,
                        wait_secs = time_til_next_update.num_seconds(),
                        "no work at the moment"
                    );
                    result.time_til_next_update = Some(time_til_next_update);
                }
            }
            NextPartition::Stale(mut partition) => {
                tracing::info!(
                    target: "scan::partition",
                    worker = %self.worker_id,
                    partition = %partition.partition_id,
                    players = partition.players.len(),
                    "refreshing stale partition"
                );
                result.time_til_next_update = Some(TimeDelta::zero());
                result.partition_id = Some(partition.partition_id.clone());
                result.are_results_official = phase::should_count_official_results(
                    &self.traits,
                    self.clock.now(),
                );

                let counters = PartitionCounters::for_players(partition.players.len());
                let update_started = Instant::now();
                let outcome = self.drain_partition(&mut partition, &counters).await;
                result.update_partition_duration = update_started.elapsed();
                result.counts = counters.snapshot();
                outcome?;
            }
        }

        result.total_duration = started.elapsed();
        self.record_refresh(&result).await?;
        Ok(result)
    }

    /// Updates the partition's players and releases its lock. A lease that
    /// expires on the way abandons the partition for this round.
    async fn drain_partition(
        &self,
        partition: &mut StalePartition,
        counters: &PartitionCounters,
    ) -> Result<()> {
        let updated = match self.update_partition(partition, counters).await {
            Ok(wins) => Ok(Some(wins)),
            Err(err) if err.is_lease_expired() => {
                tracing::error!(
                    target: "scan::partition",
                    worker = %self.worker_id,
                    partition = %partition.partition_id,
                    "the lease expired while updating the partition"
                );
                Ok(None)
            }
            Err(err) => Err(err),
        };

        if let Ok(Some(wins)) = &updated {
            partition.lock.add_wins(*wins);
        }

        let released = partition.lock.release().await.map_err(ScanError::from);
        match (updated, released) {
            (Err(err), _) => Err(err),
            (Ok(_), Ok(())) => Ok(()),
            (Ok(_), Err(err)) if err.is_lease_expired() || !err.is_critical() => {
                tracing::error!(
                    target: "scan::partition",
                    worker = %self.worker_id,
                    partition = %partition.partition_id,
                    error = %err,
                    "failed to release the partition lock"
                );
                Ok(())
            }
            (Ok(_), Err(err)) => Err(err),
        }
    }

    async fn update_partition(
        &self,
        partition: &StalePartition,
        counters: &PartitionCounters,
    ) -> Result<u64> {
        // Read per partition so configuration changes apply without a restart.
        let parallelism = self
            .tuning
            .refresh_max_parallelism()
            .or(self.settings.refresh_max_parallelism)
            .map(|limit| limit.max(1));

        self.set_app_state(&format!(
            "Updating players in set {}",
            partition.partition_id
        ))
        .await;
        tracing::debug!(
            target: "scan::partition",
            worker = %self.worker_id,
            parallelism = ?parallelism,
            "updating partition players"
        );

        let partition_wins = AtomicU64::new(0);
        stream::iter(partition.players.iter())
            .map(Ok::<_, ScanError>)
            .try_for_each_concurrent(parallelism, |player| {
                let partition_wins = &partition_wins;
                async move {
                    let wins = self.update_player(player.as_ref(), counters).await?;
                    partition_wins.fetch_add(u64::from(wins), Ordering::Relaxed);
                    Ok(())
                }
            })
            .await?;

        Ok(partition_wins.load(Ordering::Relaxed))
    }

    async fn record_refresh(&self, result: &PartitionUpdateResult) -> Result<()> {
        let mut record = self
            .participation
            .create_detailed_info_record(InfoLevel::Progress);
        result.write_to(record.as_mut());

        let increment = self
            .participation
            .increment_work_items_completed(result.counts.players_updated)
            .await;
        self.tolerate_transient("advancing the completed item count", increment)?;

        let saved = record.save().await;
        self.tolerate_transient("saving the refresh record", saved)
    }
}
