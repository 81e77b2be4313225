use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::TimeDelta;
use matchscan_contracts::tasks::DetailedInfoRecord;
use matchscan_model::PartitionId;

/// Counters shared by the concurrent player updates of one partition.
#[derive(Debug, Default)]
pub struct PartitionCounters {
    players_updated: AtomicU64,
    players_flushed: AtomicU64,
    new_matches_found: AtomicU64,
    new_wins_found: AtomicU64,
    retrieve_matches_failures: AtomicU64,
    provider_failures: AtomicU64,
    merge_failures: AtomicU64,
    save_matches_failures: AtomicU64,
    registration_failures: AtomicU64,
}

macro_rules! bump {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            pub(crate) fn $name(&self, by: u64) {
                self.$field.fetch_add(by, Ordering::Relaxed);
            }
        )*
    };
}

impl PartitionCounters {
    pub(crate) fn for_players(players: usize) -> Self {
        let counters = Self::default();
        counters
            .players_updated
            .store(players as u64, Ordering::Relaxed);
        counters
    }

    bump! {
        add_flushed => players_flushed,
        add_new_matches => new_matches_found,
        add_new_wins => new_wins_found,
        add_retrieve_failure => retrieve_matches_failures,
        add_provider_failure => provider_failures,
        add_merge_failure => merge_failures,
        add_save_failure => save_matches_failures,
        add_registration_failure => registration_failures,
    }

    pub fn snapshot(&self) -> PartitionCounts {
        let players_updated = self.players_updated.load(Ordering::Relaxed);
        let flushed = self.players_flushed.load(Ordering::Relaxed);
        PartitionCounts {
            players_updated,
            players_failed: players_updated.saturating_sub(flushed),
            new_matches_found: self.new_matches_found.load(Ordering::Relaxed),
            new_wins_found: self.new_wins_found.load(Ordering::Relaxed),
            retrieve_matches_failures: self
                .retrieve_matches_failures
                .load(Ordering::Relaxed),
            provider_failures: self.provider_failures.load(Ordering::Relaxed),
            merge_failures: self.merge_failures.load(Ordering::Relaxed),
            save_matches_failures: self
                .save_matches_failures
                .load(Ordering::Relaxed),
            registration_failures: self
                .registration_failures
                .load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PartitionCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionCounts {
    pub players_updated: u64,
    /// Players whose new matches were not flushed.
    pub players_failed: u64,
    pub new_matches_found: u64,
    /// New wins seen while official results count, before the event window
    /// filter.
    pub new_wins_found: u64,
    pub retrieve_matches_failures: u64,
    pub provider_failures: u64,
    pub merge_failures: u64,
    pub save_matches_failures: u64,
    pub registration_failures: u64,
}

/// Statistics of one partition refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionUpdateResult {
    pub partition_id: Option<PartitionId>,
    /// Wait before the next refresh; `None` when the scan has no more work.
    pub time_til_next_update: Option<TimeDelta>,
    pub total_duration: Duration,
    pub get_partition_duration: Duration,
    pub update_partition_duration: Duration,
    pub counts: PartitionCounts,
    pub are_results_official: bool,
}

impl PartitionUpdateResult {
    pub fn has_more_work(&self) -> bool {
        self.time_til_next_update.is_some()
    }

    pub(crate) fn write_to(&self, record: &mut dyn DetailedInfoRecord) {
        let millis = |duration: Duration| {
            i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
        };
        let counts = &self.counts;

        record.add_entry("PartitionId", self.partition_id.as_ref().into());
        record.add_entry(
            "TimeTilNextUpdate",
            self.time_til_next_update
                .map_or(-1, |wait| wait.num_seconds())
                .into(),
        );
        record.add_entry("TotalDuration", millis(self.total_duration).into());
        record.add_entry(
            "GetPartitionDuration",
            millis(self.get_partition_duration).into(),
        );
        record.add_entry(
            "UpdatePartitionDuration",
            millis(self.update_partition_duration).into(),
        );
        record.add_entry("NumPlayersUpdated", counts.players_updated.into());
        record.add_entry("NumNewMatchesFound", counts.new_matches_found.into());
        record.add_entry("NumNewWinsFound", counts.new_wins_found.into());
        record.add_entry(
            "NumRetrieveMatchesFailures",
            counts.retrieve_matches_failures.into(),
        );
        record.add_entry(
            "NumMatchResultsProviderFailures",
            counts.provider_failures.into(),
        );
        record.add_entry("NumMergeFailures", counts.merge_failures.into());
        record.add_entry("NumPlayersFailed", counts.players_failed.into());
        record.add_entry(
            "NumSaveMatchesFailures",
            counts.save_matches_failures.into(),
        );
        record.add_entry(
            "NumUpdateRegistrationFailures",
            counts.registration_failures.into(),
        );
        record.add_entry("AreResultsOfficial", self.are_results_official.into());
    }
}
