use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::ModelError;
use crate::ids::EventId;

/// Games whose match histories can be scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GameId {
    StarCraft,
}

impl GameId {
    pub const fn as_str(&self) -> &'static str {
        match self {
            GameId::StarCraft => "StarCraft",
        }
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "StarCraft" => Ok(GameId::StarCraft),
            other => Err(ModelError::UnknownGame(other.to_string())),
        }
    }
}

/// Per-game scan tuning carried by every event of that game.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameSettings {
    pub game_id: GameId,
    /// How stale a player's history may get before it is refreshed again.
    #[cfg_attr(feature = "serde", serde(with = "crate::filetime::serde_ticks"))]
    pub refresh_interval: TimeDelta,
    /// Upper bound on stored matches read back for a merge.
    pub matches_per_query: u32,
}

/// The slice of an administered event the scanner needs to start a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduledEvent {
    pub id: EventId,
    pub live_start: DateTime<Utc>,
    pub event_end: DateTime<Utc>,
    pub game: GameSettings,
}
