use std::fmt;

use matchscan_model::{EventId, ScanTraits, ScanWorkerId};
use tokio::sync::broadcast;

pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Why a scan worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScannerEndedReason {
    /// The worker left the task after a scan-fatal error.
    Faulted,
    /// The worker was ended before it ran out of work.
    Canceled,
    /// This worker was the last participant and no work remains.
    ScanIsTotallyFinished,
    /// Other participants are still running but nothing is left to hand out.
    ScanHasNoOutstandingWork,
}

/// Scan lifecycle notifications published by the coordinator and its workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanNotification {
    ScanStarted {
        worker: ScanWorkerId,
        traits: ScanTraits,
    },
    ScanEnded {
        worker: ScanWorkerId,
        event_id: EventId,
        /// The worker was the last participant to complete the task.
        scan_finished: bool,
        /// The worker stopped before the scan ran out of work.
        outstanding_work: bool,
    },
    /// Published after the worker loop has fully exited.
    WorkerFinished {
        worker: ScanWorkerId,
        reason: ScannerEndedReason,
    },
}

/// In-process fan-out of [`ScanNotification`]s. Publishing without
/// subscribers is not an error.
pub struct ScanEventBus {
    sender: broadcast::Sender<ScanNotification>,
    capacity: usize,
}

impl fmt::Debug for ScanEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanEventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl Default for ScanEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl ScanEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, capacity }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanNotification> {
        self.sender.subscribe()
    }

    pub fn publish(&self, notification: ScanNotification) {
        let _ = self.sender.send(notification);
    }
}
