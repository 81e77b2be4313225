use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatchOutcome {
    Win,
    Loss,
}

/// One externally reported match.
///
/// Equality covers every observable field. The merge engine aligns stored and
/// freshly fetched histories purely through `==`, so two reports of the same
/// match must compare equal field for field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchResult {
    pub outcome: MatchOutcome,
    pub played_at: DateTime<Utc>,
    pub map: String,
    pub match_type: String,
    /// Decision string exactly as the provider reported it.
    pub decision: String,
    /// Whether the match type is eligible for official totals.
    pub counts_toward_official: bool,
}

impl MatchResult {
    pub fn is_win(&self) -> bool {
        self.outcome == MatchOutcome::Win
    }
}

/// Ordering a results provider declares for the matches it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatchOrdering {
    #[default]
    MostRecentlyPlayedFirst,
    LeastRecentlyPlayedFirst,
}
