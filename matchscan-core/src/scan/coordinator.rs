//! Scan coordinator: originates scan tasks and turns assigned tasks into
//! running [`ScanWorker`]s.

use std::any::type_name_of_val;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use matchscan_contracts::ContractError;
use matchscan_contracts::provider::MatchResultsProviderFactory;
use matchscan_contracts::registration::RegistrationStore;
use matchscan_contracts::storage::MatchHistoryStorage;
use matchscan_contracts::tasks::{
    DistributedTask, ParticipantState, TaskManager, TaskRequest, TaskWorker,
    TaskWorkerFactory,
};
use matchscan_model::{
    CollectionId, EventId, ScanTraits, ScanType, ScanWorkerId, ScheduledEvent,
};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::context::{ScanContext, ScanContextParts};
use super::worker::ScanWorker;
use crate::clock::{Clock, SystemClock};
use crate::config::{ScannerSettings, ScannerTuning, StaticTuning};
use crate::error::{Result, ScanError};
use crate::events::{ScanEventBus, ScanNotification};

/// Task type shared by every scan task.
pub const SCAN_TASK_TYPE: &str = "matchScan";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitiateScanResult {
    ScanWasStarted,
    ScanWasAlreadyRunning,
    /// The task exists but no longer accepts participants.
    ScanWasAlreadyComplete,
}

/// Tracks the single active worker of a coordinator. Shared with the worker
/// contexts so a finishing loop can report back without owning the
/// coordinator.
#[derive(Debug)]
pub(crate) struct ScanLifecycle {
    active: Mutex<Option<ScanWorkerId>>,
    pub(crate) events: Arc<ScanEventBus>,
}

impl ScanLifecycle {
    pub(crate) fn new(events: Arc<ScanEventBus>) -> Self {
        Self {
            active: Mutex::new(None),
            events,
        }
    }

    fn active(&self) -> std::sync::MutexGuard<'_, Option<ScanWorkerId>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn active_worker(&self) -> Option<ScanWorkerId> {
        *self.active()
    }

    pub(crate) fn claim(&self, worker: ScanWorkerId) -> Result<()> {
        let mut active = self.active();
        if active.is_some() {
            return Err(ScanError::WorkerAlreadyActive);
        }
        *active = Some(worker);
        Ok(())
    }

    /// Drops a claim that never produced a running worker.
    pub(crate) fn release(&self, worker: ScanWorkerId) {
        let mut active = self.active();
        if *active == Some(worker) {
            *active = None;
        }
    }

    pub(crate) fn end_scan(
        &self,
        worker: ScanWorkerId,
        event_id: &EventId,
        scan_finished: bool,
        outstanding_work: bool,
    ) -> Result<()> {
        {
            let mut active = self.active();
            if *active != Some(worker) {
                return Err(ScanError::WorkerMismatch);
            }
            *active = None;
        }

        self.events.publish(ScanNotification::ScanEnded {
            worker,
            event_id: event_id.clone(),
            scan_finished,
            outstanding_work,
        });
        Ok(())
    }
}

/// Builds the traits a new scan of `scan_type` runs with.
pub fn scan_traits_for(
    scan_type: ScanType,
    event: &ScheduledEvent,
    now: DateTime<Utc>,
) -> ScanTraits {
    let result_collection = match scan_type {
        ScanType::Official => CollectionId::official(),
        ScanType::TestPass => CollectionId::new(ScanType::TestPass.as_str()),
        ScanType::Manual => CollectionId::new(Uuid::new_v4().simple().to_string()),
    };

    ScanTraits {
        event_id: event.id.clone(),
        result_collection,
        event_start: event.live_start,
        event_end: event.event_end,
        game_id: event.game.game_id,
        scan_type,
        scan_start: scan_type.is_single_pass().then_some(now),
        refresh_interval: event.game.refresh_interval,
        matches_per_query: event.game.matches_per_query,
    }
}

pub fn scan_task_id(scan_type: ScanType, event_id: &EventId) -> String {
    format!("{scan_type}{event_id}")
}

pub fn is_scan_task(task: &dyn DistributedTask) -> bool {
    task.task_type_id() == SCAN_TASK_TYPE
}

/// Originates scan tasks and acts as the worker factory for assigned ones.
///
/// At most one [`ScanWorker`] is active per coordinator; a second
/// [`ScanCoordinator::create_worker_instance`] fails until the first worker
/// reports its end.
pub struct ScanCoordinator {
    worker_label: String,
    tasks: Arc<dyn TaskManager>,
    storage: Arc<dyn MatchHistoryStorage>,
    providers: Arc<dyn MatchResultsProviderFactory>,
    registrations: Arc<dyn RegistrationStore>,
    tuning: Arc<dyn ScannerTuning>,
    clock: Arc<dyn Clock>,
    settings: ScannerSettings,
    start_suspended: bool,
    lifecycle: Arc<ScanLifecycle>,
    current: Mutex<Option<Arc<ScanWorker>>>,
}

impl fmt::Debug for ScanCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanCoordinator")
            .field("worker_label", &self.worker_label)
            .field("tasks", &type_name_of_val(self.tasks.as_ref()))
            .field("storage", &type_name_of_val(self.storage.as_ref()))
            .field("providers", &type_name_of_val(self.providers.as_ref()))
            .field(
                "registrations",
                &type_name_of_val(self.registrations.as_ref()),
            )
            .field("settings", &self.settings)
            .field("start_suspended", &self.start_suspended)
            .field("active_worker", &self.lifecycle.active_worker())
            .finish()
    }
}

impl ScanCoordinator {
    pub fn new(
        worker_label: impl Into<String>,
        tasks: Arc<dyn TaskManager>,
        storage: Arc<dyn MatchHistoryStorage>,
        providers: Arc<dyn MatchResultsProviderFactory>,
        registrations: Arc<dyn RegistrationStore>,
    ) -> Self {
        let settings = ScannerSettings::default();
        Self {
            worker_label: worker_label.into(),
            tasks,
            storage,
            providers,
            registrations,
            tuning: Arc::new(StaticTuning::from(&settings)),
            clock: Arc::new(SystemClock),
            settings,
            start_suspended: false,
            lifecycle: Arc::new(ScanLifecycle::new(Arc::new(
                ScanEventBus::default(),
            ))),
            current: Mutex::new(None),
        }
    }

    /// Replaces the settings. Also resets tuning to the settings' static
    /// values; call [`Self::with_tuning`] afterwards for live tuning.
    pub fn with_settings(mut self, settings: ScannerSettings) -> Self {
        self.tuning = Arc::new(StaticTuning::from(&settings));
        self.settings = settings;
        self
    }

    pub fn with_tuning(mut self, tuning: Arc<dyn ScannerTuning>) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: Arc<ScanEventBus>) -> Self {
        self.lifecycle = Arc::new(ScanLifecycle::new(events));
        self
    }

    /// Workers created while suspended never start their loop.
    pub fn start_suspended(mut self, suspended: bool) -> Self {
        self.start_suspended = suspended;
        self
    }

    pub fn worker_label(&self) -> &str {
        &self.worker_label
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanNotification> {
        self.lifecycle.events.subscribe()
    }

    pub fn active_worker(&self) -> Option<ScanWorkerId> {
        self.lifecycle.active_worker()
    }

    /// Creates (or joins) the scan task for `event` and leaves it again; the
    /// task monitor assigns it to a worker process later.
    pub async fn initiate_scan(
        &self,
        scan_type: ScanType,
        event: &ScheduledEvent,
    ) -> Result<InitiateScanResult> {
        let traits = scan_traits_for(scan_type, event, self.clock.now());
        let request = TaskRequest {
            task_id: scan_task_id(scan_type, &event.id),
            task_type: SCAN_TASK_TYPE.to_string(),
            priority: scan_type.priority(),
            param_string: traits.to_param_string()?,
            participant: format!("{}-initiator-{scan_type}", self.worker_label),
        };
        tracing::info!(
            target: "scan::coordinator",
            event_id = %event.id,
            task_id = %request.task_id,
            priority = request.priority,
            "initiating scan, {traits}"
        );

        let handle = match self.tasks.join_or_begin(request).await {
            Ok(handle) => handle,
            Err(ContractError::TaskIsOver) => {
                tracing::info!(
                    target: "scan::coordinator",
                    event_id = %event.id,
                    %scan_type,
                    "scan task is already complete"
                );
                return Ok(InitiateScanResult::ScanWasAlreadyComplete);
            }
            Err(err) => return Err(err.into()),
        };

        let started = handle.was_task_started();
        handle.leave(ParticipantState::Departed).await?;

        Ok(if started {
            InitiateScanResult::ScanWasStarted
        } else {
            InitiateScanResult::ScanWasAlreadyRunning
        })
    }

    /// Builds the worker for an assigned scan task. The worker is not started;
    /// the task monitor calls [`TaskWorker::begin_work`].
    pub async fn create_worker_instance(
        &self,
        task: Arc<dyn DistributedTask>,
    ) -> Result<Arc<ScanWorker>> {
        if !is_scan_task(task.as_ref()) {
            return Err(ContractError::InvalidArgument(format!(
                "task type {} is not a scan task",
                task.task_type_id()
            ))
            .into());
        }

        let worker_id = ScanWorkerId::new();
        self.lifecycle.claim(worker_id)?;

        match self.build_worker(worker_id, task.as_ref()).await {
            Ok(worker) => {
                *self.current_worker() = Some(Arc::clone(&worker));
                self.lifecycle.events.publish(ScanNotification::ScanStarted {
                    worker: worker_id,
                    traits: worker.traits().clone(),
                });
                Ok(worker)
            }
            Err(err) => {
                self.lifecycle.release(worker_id);
                tracing::error!(
                    target: "scan::coordinator",
                    task_id = task.task_id(),
                    error = %err,
                    "failed to create a scan worker"
                );
                Err(err)
            }
        }
    }

    async fn build_worker(
        &self,
        worker_id: ScanWorkerId,
        task: &dyn DistributedTask,
    ) -> Result<Arc<ScanWorker>> {
        let traits = ScanTraits::parse_param_string(task.param_string())?;
        let participation = task.join(&self.worker_label).await?;

        let wired = async {
            let event = self.storage.get_event(&traits.event_id).await?;
            let collection =
                event.result_collection(&traits.result_collection).await?;
            let provider = self.providers.create_instance(traits.game_id)?;
            Ok::<_, ContractError>((collection, provider))
        }
        .await;

        let (collection, provider) = match wired {
            Ok(wired) => wired,
            Err(err) => {
                if let Err(leave_err) =
                    participation.leave(ParticipantState::Departed).await
                {
                    tracing::warn!(
                        target: "scan::coordinator",
                        error = %leave_err,
                        "failed to leave the task after a setup failure"
                    );
                }
                return Err(err.into());
            }
        };

        tracing::info!(
            target: "scan::coordinator",
            worker = %worker_id,
            task_id = task.task_id(),
            "created scan worker, {traits}"
        );

        let context = ScanContext::new(ScanContextParts {
            worker_id,
            worker_label: self.worker_label.clone(),
            traits,
            participation,
            collection,
            provider,
            registrations: Arc::clone(&self.registrations),
            tuning: Arc::clone(&self.tuning),
            clock: Arc::clone(&self.clock),
            settings: self.settings.clone(),
            lifecycle: Arc::clone(&self.lifecycle),
        });
        Ok(Arc::new(ScanWorker::new(
            Arc::new(context),
            self.start_suspended,
        )))
    }

    /// Reports the end of `worker`'s scan. Fails when `worker` is not the
    /// active worker.
    pub fn end_scan(
        &self,
        worker: &ScanWorker,
        scan_finished: bool,
        outstanding_work: bool,
    ) -> Result<()> {
        self.lifecycle.end_scan(
            worker.id(),
            &worker.traits().event_id,
            scan_finished,
            outstanding_work,
        )
    }

    /// Ends the most recently created worker, if any.
    pub async fn shutdown(&self) {
        let current = self.current_worker().take();
        if let Some(worker) = current {
            tracing::info!(
                target: "scan::coordinator",
                worker = %worker.id(),
                "shutting down the active scan worker"
            );
            worker.end().await;
        }
    }

    fn current_worker(&self) -> std::sync::MutexGuard<'_, Option<Arc<ScanWorker>>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TaskWorkerFactory for ScanCoordinator {
    async fn create_instance(
        &self,
        task: Arc<dyn DistributedTask>,
    ) -> std::result::Result<Arc<dyn TaskWorker>, ContractError> {
        match self.create_worker_instance(task).await {
            Ok(worker) => Ok(worker as Arc<dyn TaskWorker>),
            Err(ScanError::Contract(err)) => Err(err),
            Err(ScanError::Model(err)) => {
                Err(ContractError::InvalidArgument(err.to_string()))
            }
            Err(err) => Err(ContractError::Internal(err.to_string())),
        }
    }
}
