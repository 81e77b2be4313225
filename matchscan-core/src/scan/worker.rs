//! Scan worker: owns the background refresh loop of one scan.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use matchscan_contracts::tasks::{InfoLevel, ParticipantState, TaskWorker};
use matchscan_model::{ScanTraits, ScanWorkerId, ScannerPhase};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::context::ScanContext;
use super::phase;
use super::stats::PartitionUpdateResult;
use crate::error::{Result, ScanError};
use crate::events::{ScanNotification, ScannerEndedReason};

enum LoopExit {
    Canceled,
    NoMoreWork,
}

/// Handle to a scan worker created by the
/// [`ScanCoordinator`](super::ScanCoordinator).
///
/// [`ScanWorker::begin`] starts the refresh loop on the runtime unless the
/// worker was created suspended; [`ScanWorker::end`] cancels it and waits for
/// the loop to leave the task.
pub struct ScanWorker {
    context: Arc<ScanContext>,
    cancel: CancellationToken,
    suspended: bool,
    background: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for ScanWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanWorker")
            .field("id", &self.context.worker_id)
            .field("event_id", &self.context.traits.event_id)
            .field("scan_type", &self.context.traits.scan_type)
            .field("phase", &self.context.phase())
            .field("suspended", &self.suspended)
            .field("canceled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl ScanWorker {
    pub(crate) fn new(context: Arc<ScanContext>, suspended: bool) -> Self {
        Self {
            context,
            cancel: CancellationToken::new(),
            suspended,
            background: Mutex::new(None),
        }
    }

    pub fn id(&self) -> ScanWorkerId {
        self.context.worker_id
    }

    pub fn traits(&self) -> &ScanTraits {
        &self.context.traits
    }

    /// Phase at the current instant.
    pub fn phase(&self) -> ScannerPhase {
        self.context.update_phase()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Starts the refresh loop. Does nothing for suspended workers or when the
    /// loop already runs.
    pub fn begin(&self) {
        tracing::info!(
            target: "scan::worker",
            worker = %self.context.worker_id,
            "scanner is beginning work, {}",
            self.context.traits
        );
        if self.suspended {
            tracing::error!(
                target: "scan::worker",
                worker = %self.context.worker_id,
                "scan didn't begin because the scanner was launched in suspended mode"
            );
            return;
        }

        let mut background = self.lock_background();
        if background.is_some() || self.context.has_ended() {
            return;
        }
        let context = Arc::clone(&self.context);
        let cancel = self.cancel.clone();
        *background = Some(tokio::spawn(run_scan(context, cancel)));
    }

    /// Cancels the scan and waits for the loop to exit. A worker whose loop
    /// never ran leaves the task as departed.
    pub async fn end(&self) {
        tracing::info!(
            target: "scan::worker",
            worker = %self.context.worker_id,
            "ending work"
        );
        self.cancel.cancel();

        let background = self.lock_background().take();
        match background {
            Some(handle) => {
                if let Err(err) = handle.await {
                    tracing::error!(
                        target: "scan::worker",
                        worker = %self.context.worker_id,
                        error = %err,
                        "scan loop did not shut down cleanly"
                    );
                    self.context.notify_end(false, true);
                }
            }
            None if !self.context.has_ended() => {
                if let Err(err) =
                    self.context.participation.leave(ParticipantState::Departed).await
                {
                    tracing::warn!(
                        target: "scan::worker",
                        worker = %self.context.worker_id,
                        error = %err,
                        "failed to leave the task"
                    );
                }
                self.context.notify_end(false, true);
            }
            None => {}
        }
    }

    /// Heartbeats the lease outside the loop, for harnesses that move the
    /// clock around.
    pub async fn heartbeat(&self) -> Result<()> {
        self.context.participation.heartbeat().await?;
        Ok(())
    }

    /// Runs a single partition refresh on the caller's task.
    pub async fn refresh_next_partition(&self) -> Result<PartitionUpdateResult> {
        self.context.refresh_next_partition().await
    }

    fn lock_background(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.background
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TaskWorker for ScanWorker {
    async fn begin_work(&self) {
        self.begin();
    }

    async fn end_work(&self) {
        self.end().await;
    }
}

async fn run_scan(context: Arc<ScanContext>, cancel: CancellationToken) {
    tracing::info!(
        target: "scan::worker",
        worker = %context.worker_id,
        "starting up the scanner loop"
    );

    let outcome = match run_loop(&context, &cancel).await {
        Ok(exit) => wrap_up(&context, exit).await,
        Err(err) => Err(err),
    };

    let reason = match outcome {
        Ok(reason) => reason,
        Err(err) => {
            record_fault(&context, &err).await;
            ScannerEndedReason::Faulted
        }
    };

    context.notify_end(false, true);

    let events = Arc::clone(&context.lifecycle.events);
    let worker = context.worker_id;
    tokio::spawn(async move {
        events.publish(ScanNotification::WorkerFinished { worker, reason });
    });
}

async fn run_loop(context: &ScanContext, cancel: &CancellationToken) -> Result<LoopExit> {
    let traits = &context.traits;
    let mut wait = TimeDelta::zero();

    loop {
        if phase::test_pass_overruns(traits, context.clock.now()) {
            tracing::error!(
                target: "scan::worker",
                worker = %context.worker_id,
                "scanner is running a test pass close to the event start time"
            );
            return Err(ScanError::TestScanRanLong {
                event_id: traits.event_id.clone(),
                worker: context.worker_label.clone(),
            });
        }

        context.update_phase();

        let sleep_for = wait.to_std().unwrap_or(Duration::ZERO);
        tracing::debug!(
            target: "scan::worker",
            worker = %context.worker_id,
            sleep = %humantime::format_duration(sleep_for),
            "sleeping until the next refresh"
        );
        context
            .set_app_state(&format!(
                "Sleeping for {}",
                humantime::format_duration(sleep_for)
            ))
            .await;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(
                    target: "scan::worker",
                    worker = %context.worker_id,
                    "breaking out of the scan loop because the scan was canceled"
                );
                return Ok(LoopExit::Canceled);
            }
            _ = tokio::time::sleep(sleep_for) => {}
        }

        let heartbeat = context.participation.heartbeat().await;
        context.tolerate_transient("heartbeat", heartbeat)?;

        let refreshed = context.refresh_next_partition().await?;
        let Some(next) = refreshed.time_til_next_update else {
            tracing::info!(
                target: "scan::worker",
                worker = %context.worker_id,
                "breaking out of the scan loop because no further work remains"
            );
            return Ok(LoopExit::NoMoreWork);
        };

        wait = phase::clamp_wait(
            next,
            context.settings.max_heartbeat_interval(),
            traits,
            context.clock.now(),
        );
    }
}

async fn wrap_up(context: &ScanContext, exit: LoopExit) -> Result<ScannerEndedReason> {
    match exit {
        LoopExit::Canceled => {
            tracing::info!(
                target: "scan::worker",
                worker = %context.worker_id,
                "leaving the task due to cancelation"
            );
            context
                .participation
                .leave(ParticipantState::Departed)
                .await?;
            context.notify_end(false, true);
            Ok(ScannerEndedReason::Canceled)
        }
        LoopExit::NoMoreWork => {
            tracing::info!(
                target: "scan::worker",
                worker = %context.worker_id,
                "leaving the task due to scan completion"
            );
            let finished = context
                .participation
                .leave(ParticipantState::Complete)
                .await?;
            context.notify_end(finished, false);
            Ok(if finished {
                ScannerEndedReason::ScanIsTotallyFinished
            } else {
                ScannerEndedReason::ScanHasNoOutstandingWork
            })
        }
    }
}

async fn record_fault(context: &ScanContext, err: &ScanError) {
    tracing::error!(
        target: "scan::worker",
        worker = %context.worker_id,
        event_id = %context.traits.event_id,
        error = %err,
        "scanner encountered an error and will terminate"
    );

    let detail = format!("{err:?}");
    if let Err(info_err) = context
        .participation
        .add_info(InfoLevel::Error, &err.to_string(), Some(&detail))
        .await
    {
        tracing::warn!(
            target: "scan::worker",
            worker = %context.worker_id,
            error = %info_err,
            "failed to record the fault on the task"
        );
    }
    if let Err(leave_err) = context.participation.leave(ParticipantState::Faulted).await {
        tracing::warn!(
            target: "scan::worker",
            worker = %context.worker_id,
            error = %leave_err,
            "failed to leave the task as faulted"
        );
    }
}
