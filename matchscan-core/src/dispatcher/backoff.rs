use std::time::Duration;

use tokio::time::Instant;

use crate::config::DispatcherSettings;

/// Process-wide adaptive backoff shared by every request of a dispatcher.
///
/// Throttling doubles the delay between requests (starting at the minimum,
/// capped at the maximum). Once a full recovery window passes without
/// throttling, each successful request halves it, until it drops below the
/// minimum and is cleared.
#[derive(Debug, Clone)]
pub(crate) struct BackoffState {
    min: Duration,
    max: Duration,
    recovery: Duration,
    backoff: Option<Duration>,
    last_throttled: Option<Instant>,
    last_request: Option<Instant>,
}

impl BackoffState {
    pub(crate) fn new(settings: &DispatcherSettings) -> Self {
        Self {
            min: settings.min_backoff(),
            max: settings.max_backoff().max(settings.min_backoff()),
            recovery: settings.backoff_recovery(),
            backoff: None,
            last_throttled: None,
            last_request: None,
        }
    }

    pub(crate) fn backoff(&self) -> Option<Duration> {
        self.backoff
    }

    /// Earliest instant the next request may be sent, if a backoff applies.
    pub(crate) fn next_request_at(&self) -> Option<Instant> {
        let backoff = self.backoff?;
        self.last_request.map(|last| last + backoff)
    }

    pub(crate) fn record_request(&mut self, now: Instant) {
        self.last_request = Some(now);
    }

    pub(crate) fn record_throttle(&mut self, now: Instant) {
        self.last_throttled = Some(now);
        self.backoff = Some(match self.backoff {
            None => self.min,
            Some(current) => current.saturating_mul(2).min(self.max),
        });
    }

    pub(crate) fn record_success(&mut self, now: Instant) {
        let Some(current) = self.backoff else {
            return;
        };
        let recovered = self
            .last_throttled
            .is_none_or(|at| now.saturating_duration_since(at) > self.recovery);
        if !recovered {
            return;
        }

        let reduced = current / 2;
        if reduced < self.min {
            self.backoff = None;
        } else {
            self.backoff = Some(reduced);
            self.last_throttled = Some(now);
        }
    }
}
