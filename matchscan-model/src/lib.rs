//! Core data model definitions shared across matchscan crates.
#![allow(missing_docs)]

pub use ::chrono;

pub mod error;
pub mod filetime;
pub mod game;
pub mod ids;
pub mod matches;
pub mod phase;
pub mod prelude;
pub mod scan;

// Intentionally curated re-exports for downstream consumers.
pub use error::{ModelError, Result};
pub use game::{GameId, GameSettings, ScheduledEvent};
pub use ids::{CollectionId, EventId, PartitionId, PlayerId, ScanWorkerId};
pub use matches::{MatchOrdering, MatchOutcome, MatchResult};
pub use phase::ScannerPhase;
pub use scan::{ScanTraits, ScanType};
