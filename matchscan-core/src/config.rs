use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Knobs for the scan worker loop.
///
/// All fields carry defaults so deployments only spell out what they change.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScannerSettings {
    /// Upper bound on a single sleep between refreshes; the lease is
    /// heartbeated at least this often.
    pub max_heartbeat_interval_ms: u64,
    /// Lease requested on every stale partition.
    pub partition_lease_ms: u64,
    /// Concurrent player updates per partition. `None` means unbounded.
    /// Runtime tuning sources take precedence, see [`ScannerTuning`].
    pub refresh_max_parallelism: Option<usize>,
    /// Fetch retries for stored and fresh match histories.
    pub fetch_retry: RetryPolicy,
    /// Retries for the registration win update.
    pub registration_retry: RetryPolicy,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            max_heartbeat_interval_ms: 10 * 60 * 1_000,
            partition_lease_ms: 2 * 60 * 1_000,
            refresh_max_parallelism: None,
            fetch_retry: RetryPolicy {
                max_attempts: 3,
                pause_ms: 500,
            },
            registration_retry: RetryPolicy {
                max_attempts: 3,
                pause_ms: 1_000,
            },
        }
    }
}

impl ScannerSettings {
    pub fn max_heartbeat_interval(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::milliseconds(
            i64::try_from(self.max_heartbeat_interval_ms).unwrap_or(i64::MAX),
        )
    }

    pub fn partition_lease(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::milliseconds(
            i64::try_from(self.partition_lease_ms).unwrap_or(i64::MAX),
        )
    }
}

/// Fixed-pause retry policy.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub pause_ms: u64,
}

impl RetryPolicy {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

/// Adaptive backoff and retry constants for the API dispatcher.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DispatcherSettings {
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Quiet period after the last throttle before the backoff is halved.
    pub backoff_recovery_ms: u64,
    pub max_attempts: u32,
    /// Pause between attempts of one request, regardless of global backoff.
    pub retry_pause_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            min_backoff_ms: 100,
            max_backoff_ms: 3_000,
            backoff_recovery_ms: 10 * 60 * 1_000,
            max_attempts: 5,
            retry_pause_ms: 500,
            request_timeout_ms: 30_000,
        }
    }
}

impl DispatcherSettings {
    pub fn min_backoff(&self) -> Duration {
        Duration::from_millis(self.min_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn backoff_recovery(&self) -> Duration {
        Duration::from_millis(self.backoff_recovery_ms)
    }

    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.retry_pause_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Runtime tuning read fresh before every partition, so operators can change
/// scanner pressure without restarting workers.
pub trait ScannerTuning: Send + Sync {
    fn refresh_max_parallelism(&self) -> Option<usize>;
}

/// Tuning fixed at construction time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StaticTuning {
    pub refresh_max_parallelism: Option<usize>,
}

impl ScannerTuning for StaticTuning {
    fn refresh_max_parallelism(&self) -> Option<usize> {
        self.refresh_max_parallelism
    }
}

impl From<&ScannerSettings> for StaticTuning {
    fn from(settings: &ScannerSettings) -> Self {
        Self {
            refresh_max_parallelism: settings.refresh_max_parallelism,
        }
    }
}
