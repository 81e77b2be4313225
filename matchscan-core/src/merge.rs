//! Reconciles a stored match history with a freshly fetched one.

use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MergeError {
    /// Stored history cannot legitimately outgrow the freshest fetch.
    #[error(
        "stored history holds {previous} matches but the latest fetch only {latest}"
    )]
    HistoryLongerThanLatest { previous: usize, latest: usize },

    /// The stored history does not appear as a contiguous window of the
    /// latest fetch, so the new matches cannot be determined.
    #[error(
        "stored history of {previous} matches does not align with the latest {latest}"
    )]
    NoAlignment { previous: usize, latest: usize },
}

impl MergeError {
    /// A longer stored history means corrupted state; a missing alignment is
    /// confined to one player.
    pub fn is_critical(&self) -> bool {
        matches!(self, MergeError::HistoryLongerThanLatest { .. })
    }
}

/// Returns the prefix of `latest` that is missing from `previous`.
///
/// Both slices are ordered most recently played first. The result is
/// `latest[..k]` for the smallest offset `k` at which `previous` lines up
/// element by element with `latest[k..k + previous.len()]`. An empty
/// `previous` makes every element of `latest` new.
pub fn new_matches<'a, T: PartialEq>(
    previous: &[T],
    latest: &'a [T],
) -> Result<&'a [T], MergeError> {
    if previous.len() > latest.len() {
        return Err(MergeError::HistoryLongerThanLatest {
            previous: previous.len(),
            latest: latest.len(),
        });
    }

    if previous.is_empty() {
        return Ok(latest);
    }

    (0..=latest.len() - previous.len())
        .find(|&offset| latest[offset..offset + previous.len()] == *previous)
        .map(|offset| &latest[..offset])
        .ok_or(MergeError::NoAlignment {
            previous: previous.len(),
            latest: latest.len(),
        })
}
