//! Time-dependent scan decisions. Everything here is a pure function of the
//! scan traits and the current instant.

use chrono::{DateTime, TimeDelta, Utc};
use matchscan_model::{MatchResult, ScanTraits, ScanType, ScannerPhase};

use crate::error::{Result, ScanError};

pub fn current_phase(traits: &ScanTraits, now: DateTime<Utc>) -> ScannerPhase {
    match traits.scan_type {
        ScanType::TestPass => ScannerPhase::TestScan,
        ScanType::Manual => ScannerPhase::ManualScan,
        ScanType::Official if now < traits.event_start => {
            ScannerPhase::OfficialBaseline
        }
        ScanType::Official if now < traits.event_end => {
            ScannerPhase::OfficialInProgress
        }
        ScanType::Official => ScannerPhase::OfficialFinishing,
    }
}

/// Official totals only move for official scans once the event has started.
/// Before that, matches are stored as a baseline.
pub fn should_count_official_results(
    traits: &ScanTraits,
    now: DateTime<Utc>,
) -> bool {
    traits.scan_type == ScanType::Official && now > traits.event_start
}

/// A win counts only when it was played strictly inside the event window.
pub fn counts_toward_event(traits: &ScanTraits, result: &MatchResult) -> bool {
    result.is_win()
        && result.played_at > traits.event_start
        && result.played_at < traits.event_end
}

pub fn wins_toward_event(
    traits: &ScanTraits,
    now: DateTime<Utc>,
    new_matches: &[MatchResult],
) -> u32 {
    if !should_count_official_results(traits, now) {
        return 0;
    }
    let wins = new_matches
        .iter()
        .filter(|result| counts_toward_event(traits, result))
        .count();
    u32::try_from(wins).unwrap_or(u32::MAX)
}

/// How stale a partition must be before it is refreshed.
///
/// Official scans use the game's refresh interval while the event runs and
/// "everything not refreshed since the event ended" afterwards. Single-pass
/// scans pick up whatever was not refreshed since the scan started.
pub fn stale_threshold(
    traits: &ScanTraits,
    now: DateTime<Utc>,
) -> Result<TimeDelta> {
    match traits.scan_type {
        ScanType::Official if now > traits.event_end => {
            Ok(now - traits.event_end)
        }
        ScanType::Official => Ok(traits.refresh_interval),
        ScanType::TestPass | ScanType::Manual => traits
            .scan_start
            .map(|start| now - start)
            .ok_or_else(|| ScanError::MissingScanStart(traits.event_id.clone())),
    }
}

/// A test pass must be over before the event starts; one whose next refresh
/// could run past the start is aborted.
pub fn test_pass_overruns(traits: &ScanTraits, now: DateTime<Utc>) -> bool {
    traits.scan_type == ScanType::TestPass
        && now + traits.refresh_interval > traits.event_start
}

/// Clamps the wait before the next refresh to the heartbeat interval and to
/// the time left until the event ends. Past the end, the next refresh runs
/// immediately.
pub fn clamp_wait(
    wait: TimeDelta,
    max_heartbeat_interval: TimeDelta,
    traits: &ScanTraits,
    now: DateTime<Utc>,
) -> TimeDelta {
    let wait = wait.min(max_heartbeat_interval);
    let until_end = traits.event_end - now;

    if until_end <= TimeDelta::zero() {
        TimeDelta::zero()
    } else {
        wait.min(until_end)
    }
}
