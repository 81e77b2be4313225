use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{ModelError, Result};
use crate::filetime;
use crate::game::GameId;
use crate::ids::{CollectionId, EventId};

/// Kind of scan requested for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScanType {
    /// Runs through the event and counts wins once it has started.
    Official,
    /// Single pass that must finish before the event starts.
    TestPass,
    /// Single pass into an arbitrary result collection.
    Manual,
}

impl ScanType {
    pub const ALL: [ScanType; 3] =
        [ScanType::Official, ScanType::TestPass, ScanType::Manual];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ScanType::Official => "Official",
            ScanType::TestPass => "TestPass",
            ScanType::Manual => "Manual",
        }
    }

    /// Distributed task priority; higher wins arbitration.
    pub const fn priority(&self) -> i32 {
        match self {
            ScanType::Official => i32::MAX,
            ScanType::TestPass => 10,
            ScanType::Manual => 9,
        }
    }

    /// Single-pass scans visit each player once and then finish.
    pub const fn is_single_pass(&self) -> bool {
        matches!(self, ScanType::TestPass | ScanType::Manual)
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        ScanType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ModelError::UnknownScanType(s.to_string()))
    }
}

/// Immutable descriptor of one scan run.
///
/// Travels between processes as the distributed task parameter string, see
/// [`ScanTraits::to_param_string`] and [`ScanTraits::parse_param_string`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanTraits {
    pub event_id: EventId,
    pub result_collection: CollectionId,
    pub event_start: DateTime<Utc>,
    pub event_end: DateTime<Utc>,
    pub game_id: GameId,
    pub scan_type: ScanType,
    /// Only recorded for single-pass scans.
    pub scan_start: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "serde", serde(with = "crate::filetime::serde_ticks"))]
    pub refresh_interval: TimeDelta,
    pub matches_per_query: u32,
}

const PARAM_FIELDS: usize = 9;
const PARAM_SEPARATOR: char = ';';
const NULL_FIELD: &str = "null";

impl ScanTraits {
    /// Encodes the traits as `;`-delimited fields: event id, result
    /// collection, event start, event end, game, scan type, scan start (or
    /// `null`), refresh interval ticks, matches per query. Instants are
    /// file-time values.
    pub fn to_param_string(&self) -> Result<String> {
        for (field, value) in [
            ("event_id", self.event_id.as_str()),
            ("result_collection", self.result_collection.as_str()),
        ] {
            if value.contains(PARAM_SEPARATOR) {
                return Err(ModelError::InvalidField {
                    field,
                    value: value.to_string(),
                });
            }
        }

        let scan_start = match self.scan_start {
            Some(instant) => filetime::to_file_time(instant)?.to_string(),
            None => NULL_FIELD.to_string(),
        };

        Ok(format!(
            "{};{};{};{};{};{};{};{};{}",
            self.event_id,
            self.result_collection,
            filetime::to_file_time(self.event_start)?,
            filetime::to_file_time(self.event_end)?,
            self.game_id,
            self.scan_type,
            scan_start,
            filetime::to_ticks(self.refresh_interval)?,
            self.matches_per_query,
        ))
    }

    pub fn parse_param_string(raw: &str) -> Result<Self> {
        let fields: Vec<&str> = raw.split(PARAM_SEPARATOR).collect();
        if fields.len() != PARAM_FIELDS {
            return Err(ModelError::FieldCount {
                expected: PARAM_FIELDS,
                found: fields.len(),
            });
        }

        let scan_start = match fields[6] {
            NULL_FIELD => None,
            value => Some(filetime::from_file_time(parse_i64(
                "scan_start",
                value,
            )?)?),
        };

        let refresh_ticks = parse_i64("refresh_interval", fields[7])?;
        if refresh_ticks < 0 {
            return Err(ModelError::InvalidField {
                field: "refresh_interval",
                value: fields[7].to_string(),
            });
        }

        let matches_per_query =
            fields[8].parse::<u32>().map_err(|_| ModelError::InvalidField {
                field: "matches_per_query",
                value: fields[8].to_string(),
            })?;

        Ok(Self {
            event_id: EventId::new(fields[0]),
            result_collection: CollectionId::new(fields[1]),
            event_start: filetime::from_file_time(parse_i64(
                "event_start",
                fields[2],
            )?)?,
            event_end: filetime::from_file_time(parse_i64(
                "event_end",
                fields[3],
            )?)?,
            game_id: fields[4].parse()?,
            scan_type: fields[5].parse()?,
            scan_start,
            refresh_interval: filetime::from_ticks(refresh_ticks)?,
            matches_per_query,
        })
    }
}

impl FromStr for ScanTraits {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_param_string(s)
    }
}

impl fmt::Display for ScanTraits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scan Traits: Type={}, EventId={}, Game={}, Results={}, EventStart={}, ScanStart=",
            self.scan_type,
            self.event_id,
            self.game_id,
            self.result_collection,
            self.event_start.to_rfc3339(),
        )?;
        match self.scan_start {
            Some(start) => write!(f, "{}", start.to_rfc3339())?,
            None => f.write_str("none")?,
        }
        write!(
            f,
            ", End={}, RefreshTime={}s",
            self.event_end.to_rfc3339(),
            self.refresh_interval.num_seconds()
        )
    }
}

fn parse_i64(field: &'static str, value: &str) -> Result<i64> {
    value.parse::<i64>().map_err(|_| ModelError::InvalidField {
        field,
        value: value.to_string(),
    })
}
