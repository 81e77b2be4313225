//! # Matchscan Core
//!
//! Scans registered players' third-party match histories during a scheduled
//! event and credits the wins played inside the event window.
//!
//! ## Overview
//!
//! - [`dispatcher`]: process-wide rate-limited HTTP dispatcher with adaptive
//!   backoff and failure classification
//! - [`merge`]: finds the matches a provider reports that storage has not
//!   seen yet
//! - [`scan`]: phases, partition refresh, the [`ScanWorker`] loop and the
//!   [`ScanCoordinator`] built on distributed tasks
//! - [`providers`]: match results providers per game
//! - [`events`]: in-process scan lifecycle notifications
//!
//! External services (task primitive, storage, registration store) are
//! consumed through the traits in `matchscan-contracts`.
#![allow(missing_docs)]

pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod merge;
pub mod providers;
pub mod scan;

pub use clock::{Clock, SystemClock};
pub use config::{
    DispatcherSettings, RetryPolicy, ScannerSettings, ScannerTuning,
    StaticTuning,
};
pub use dispatcher::{ApiDispatcher, DispatchError, FailureClass};
pub use error::{Result, ScanError};
pub use events::{ScanEventBus, ScanNotification, ScannerEndedReason};
pub use merge::{MergeError, new_matches};
pub use providers::{ProviderRegistry, StarCraftProvider};
pub use scan::{InitiateScanResult, ScanCoordinator, ScanWorker};
