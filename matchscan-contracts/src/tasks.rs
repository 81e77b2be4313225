//! Distributed task primitive: prioritized shared tasks that processes join,
//! heartbeat and leave.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ContractResult;

/// State a participant reports when leaving a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantState {
    Departed,
    Complete,
    Faulted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoLevel {
    Progress,
    Info,
    Warning,
    Error,
}

/// Value stored under a detailed info record key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoValue {
    Missing,
    Text(String),
    Integer(i64),
}

impl From<i64> for InfoValue {
    fn from(value: i64) -> Self {
        InfoValue::Integer(value)
    }
}

impl From<u64> for InfoValue {
    fn from(value: u64) -> Self {
        InfoValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<bool> for InfoValue {
    fn from(value: bool) -> Self {
        InfoValue::Integer(i64::from(value))
    }
}

impl<T: fmt::Display> From<Option<T>> for InfoValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => InfoValue::Text(value.to_string()),
            None => InfoValue::Missing,
        }
    }
}

/// Structured progress record attached to a participation.
#[async_trait]
pub trait DetailedInfoRecord: Send {
    fn add_entry(&mut self, key: &str, value: InfoValue);

    async fn save(&mut self) -> ContractResult<()>;
}

#[async_trait]
pub trait ParticipationHandle: Send + Sync {
    /// True when the join that produced this handle created the task.
    fn was_task_started(&self) -> bool;

    /// Returns whether this was the last participant to leave.
    async fn leave(&self, state: ParticipantState) -> ContractResult<bool>;

    async fn heartbeat(&self) -> ContractResult<()>;

    async fn set_app_state(&self, state: &str) -> ContractResult<()>;

    async fn add_info(
        &self,
        level: InfoLevel,
        message: &str,
        detail: Option<&str>,
    ) -> ContractResult<()>;

    fn create_detailed_info_record(
        &self,
        level: InfoLevel,
    ) -> Box<dyn DetailedInfoRecord>;

    async fn increment_work_items_completed(
        &self,
        count: u64,
    ) -> ContractResult<()>;
}

#[async_trait]
pub trait DistributedTask: Send + Sync {
    fn task_id(&self) -> &str;

    fn task_type_id(&self) -> &str;

    fn param_string(&self) -> &str;

    async fn join(
        &self,
        participant: &str,
    ) -> ContractResult<Arc<dyn ParticipationHandle>>;
}

/// Arguments of [`TaskManager::join_or_begin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    pub task_id: String,
    pub task_type: String,
    pub priority: i32,
    pub param_string: String,
    pub participant: String,
}

#[async_trait]
pub trait TaskManager: Send + Sync {
    /// Joins the task, creating it first when absent. Fails with
    /// [`crate::ContractError::TaskIsOver`] once the task stopped accepting
    /// participants.
    async fn join_or_begin(
        &self,
        request: TaskRequest,
    ) -> ContractResult<Arc<dyn ParticipationHandle>>;
}

/// Work unit a monitor runs for an assigned task.
#[async_trait]
pub trait TaskWorker: Send + Sync {
    async fn begin_work(&self);

    /// Requests cooperative cancellation and waits for the work to stop.
    async fn end_work(&self);
}

#[async_trait]
pub trait TaskWorkerFactory: Send + Sync {
    async fn create_instance(
        &self,
        task: Arc<dyn DistributedTask>,
    ) -> ContractResult<Arc<dyn TaskWorker>>;
}
