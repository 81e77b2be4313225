//! Scan orchestration: phases, per-player updates, partition refresh, the
//! worker loop and the coordinator that creates workers.

mod context;
mod partition;
mod player;

pub mod coordinator;
pub mod phase;
pub mod stats;
pub mod worker;

pub use coordinator::{
    InitiateScanResult, SCAN_TASK_TYPE, ScanCoordinator, is_scan_task,
    scan_task_id, scan_traits_for,
};
pub use stats::{PartitionCounts, PartitionUpdateResult};
pub use worker::ScanWorker;
