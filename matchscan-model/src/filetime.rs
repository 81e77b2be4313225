//! Conversions between chrono values and the 100ns tick encodings used on the
//! task parameter wire format.
//!
//! Instants travel as file-time values (ticks since 1601-01-01 UTC) and spans
//! travel as plain tick counts.

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{ModelError, Result};

pub const TICKS_PER_SECOND: i64 = 10_000_000;
const NANOS_PER_TICK: i64 = 100;
/// Ticks between 1601-01-01 and the unix epoch.
pub const UNIX_EPOCH_FILE_TIME: i64 = 116_444_736_000_000_000;

pub fn to_file_time(instant: DateTime<Utc>) -> Result<i64> {
    let whole = instant
        .timestamp()
        .checked_mul(TICKS_PER_SECOND)
        .and_then(|ticks| {
            ticks.checked_add(
                i64::from(instant.timestamp_subsec_nanos()) / NANOS_PER_TICK,
            )
        })
        .and_then(|ticks| ticks.checked_add(UNIX_EPOCH_FILE_TIME));

    match whole {
        Some(ticks) if ticks >= 0 => Ok(ticks),
        _ => Err(ModelError::OutOfRange(instant.timestamp())),
    }
}

pub fn from_file_time(file_time: i64) -> Result<DateTime<Utc>> {
    if file_time < 0 {
        return Err(ModelError::OutOfRange(file_time));
    }

    let unix_ticks = file_time - UNIX_EPOCH_FILE_TIME;
    let secs = unix_ticks.div_euclid(TICKS_PER_SECOND);
    let nanos = (unix_ticks.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK) as u32;

    DateTime::from_timestamp(secs, nanos)
        .ok_or(ModelError::OutOfRange(file_time))
}

pub fn to_ticks(span: TimeDelta) -> Result<i64> {
    span.num_seconds()
        .checked_mul(TICKS_PER_SECOND)
        .and_then(|ticks| {
            ticks.checked_add(i64::from(span.subsec_nanos()) / NANOS_PER_TICK)
        })
        .ok_or(ModelError::OutOfRange(span.num_seconds()))
}

pub fn from_ticks(ticks: i64) -> Result<TimeDelta> {
    let secs = TimeDelta::try_seconds(ticks.div_euclid(TICKS_PER_SECOND))
        .ok_or(ModelError::OutOfRange(ticks))?;
    let rest = TimeDelta::nanoseconds(
        ticks.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK,
    );
    secs.checked_add(&rest).ok_or(ModelError::OutOfRange(ticks))
}

/// Serde adapter that stores a [`TimeDelta`] as a tick count.
#[cfg(feature = "serde")]
pub mod serde_ticks {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _, ser::Error as _};

    pub fn serialize<S: Serializer>(
        span: &TimeDelta,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let ticks = super::to_ticks(*span).map_err(S::Error::custom)?;
        serializer.serialize_i64(ticks)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<TimeDelta, D::Error> {
        let ticks = i64::deserialize(deserializer)?;
        super::from_ticks(ticks).map_err(D::Error::custom)
    }
}
