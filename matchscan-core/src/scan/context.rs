use std::any::type_name_of_val;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use matchscan_contracts::{
    provider::MatchResultsProvider,
    registration::RegistrationStore,
    storage::ResultCollection,
    tasks::ParticipationHandle,
};
use matchscan_model::{ScanTraits, ScanWorkerId, ScannerPhase};

use super::coordinator::ScanLifecycle;
use super::phase;
use crate::clock::Clock;
use crate::config::{ScannerSettings, ScannerTuning};
use crate::error::ScanError;

/// Everything a running scan needs, shared between the worker handle and its
/// background loop.
pub(crate) struct ScanContext {
    pub(crate) worker_id: ScanWorkerId,
    /// Participant label used on the distributed task.
    pub(crate) worker_label: String,
    pub(crate) traits: ScanTraits,
    pub(crate) participation: Arc<dyn ParticipationHandle>,
    pub(crate) collection: Arc<dyn ResultCollection>,
    pub(crate) provider: Arc<dyn MatchResultsProvider>,
    pub(crate) registrations: Arc<dyn RegistrationStore>,
    pub(crate) tuning: Arc<dyn ScannerTuning>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) settings: ScannerSettings,
    pub(crate) lifecycle: Arc<ScanLifecycle>,
    phase: Mutex<ScannerPhase>,
    scan_ended: AtomicBool,
}

impl fmt::Debug for ScanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanContext")
            .field("worker_id", &self.worker_id)
            .field("worker_label", &self.worker_label)
            .field("traits", &self.traits)
            .field("provider", &type_name_of_val(self.provider.as_ref()))
            .field("settings", &self.settings)
            .field("phase", &self.phase())
            .field("scan_ended", &self.scan_ended.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

pub(crate) struct ScanContextParts {
    pub(crate) worker_id: ScanWorkerId,
    pub(crate) worker_label: String,
    pub(crate) traits: ScanTraits,
    pub(crate) participation: Arc<dyn ParticipationHandle>,
    pub(crate) collection: Arc<dyn ResultCollection>,
    pub(crate) provider: Arc<dyn MatchResultsProvider>,
    pub(crate) registrations: Arc<dyn RegistrationStore>,
    pub(crate) tuning: Arc<dyn ScannerTuning>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) settings: ScannerSettings,
    pub(crate) lifecycle: Arc<ScanLifecycle>,
}

impl ScanContext {
    pub(crate) fn new(parts: ScanContextParts) -> Self {
        let phase = phase::current_phase(&parts.traits, parts.clock.now());
        Self {
            worker_id: parts.worker_id,
            worker_label: parts.worker_label,
            traits: parts.traits,
            participation: parts.participation,
            collection: parts.collection,
            provider: parts.provider,
            registrations: parts.registrations,
            tuning: parts.tuning,
            clock: parts.clock,
            settings: parts.settings,
            lifecycle: parts.lifecycle,
            phase: Mutex::new(phase),
            scan_ended: AtomicBool::new(false),
        }
    }

    pub(crate) fn phase(&self) -> ScannerPhase {
        *self.phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn update_phase(&self) -> ScannerPhase {
        let phase = phase::current_phase(&self.traits, self.clock.now());
        *self.phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) =
            phase;
        phase
    }

    /// Publishes `[{phase}] - {state}` on the task. Best effort.
    pub(crate) async fn set_app_state(&self, state: &str) {
        let full_state = format!("[{}] - {state}", self.phase());
        if let Err(err) = self.participation.set_app_state(&full_state).await {
            tracing::warn!(
                target: "scan::worker",
                worker = %self.worker_id,
                error = %err,
                "failed to update app state"
            );
        }
    }

    /// Reports the end of the scan to the coordinator. Only the first call
    /// has an effect.
    pub(crate) fn notify_end(&self, scan_finished: bool, outstanding_work: bool) {
        if self.scan_ended.swap(true, Ordering::AcqRel) {
            return;
        }

        tracing::info!(
            target: "scan::worker",
            worker = %self.worker_id,
            scan_finished,
            outstanding_work,
            "notifying subscribers that the scan has ended"
        );
        if let Err(err) = self.lifecycle.end_scan(
            self.worker_id,
            &self.traits.event_id,
            scan_finished,
            outstanding_work,
        ) {
            tracing::error!(
                target: "scan::worker",
                worker = %self.worker_id,
                error = %err,
                "coordinator refused the scan end"
            );
        }
    }

    pub(crate) fn has_ended(&self) -> bool {
        self.scan_ended.load(Ordering::Acquire)
    }

    /// Absorbs transient collaborator faults on bookkeeping calls.
    pub(crate) fn tolerate_transient(
        &self,
        what: &str,
        result: std::result::Result<(), matchscan_contracts::ContractError>,
    ) -> crate::error::Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.is_transient() => {
                tracing::warn!(
                    target: "scan::worker",
                    worker = %self.worker_id,
                    error = %err,
                    "{what} failed"
                );
                Ok(())
            }
            Err(err) => Err(ScanError::from(err)),
        }
    }
}
