//! Scanner focused snapshot of the model surface.
//! Prefer importing from this module instead of individual tree nodes when
//! wiring collaborators or writing harnesses.

pub use super::game::{GameId, GameSettings, ScheduledEvent};
pub use super::ids::{
    CollectionId, EventId, PartitionId, PlayerId, ScanWorkerId,
};
pub use super::matches::{MatchOrdering, MatchOutcome, MatchResult};
pub use super::phase::ScannerPhase;
pub use super::scan::{ScanTraits, ScanType};
