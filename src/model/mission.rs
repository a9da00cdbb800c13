//! Mission types: the operational session files are collected under.

use jiff::{Timestamp, civil::DateTime, tz::TimeZone};

/// Format the operator types the mission start in (local wall-clock time).
pub const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, thiserror::Error)]
pub enum MissionError {
    #[error("mission name is empty")]
    EmptyName,

    #[error("invalid mission time '{input}' (expected YYYY-MM-DD HH:MM): {source}")]
    InvalidTime {
        input: String,
        #[source]
        source: jiff::Error,
    },
}

/// A named, timestamped session. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mission {
    name: String,
    start: Timestamp,
}

impl Mission {
    /// Creates a mission from operator input, sanitizing the name.
    pub fn new(raw_name: &str, start: Timestamp) -> Result<Self, MissionError> {
        let trimmed = raw_name.trim();
        if trimmed.is_empty() {
            return Err(MissionError::EmptyName);
        }
        Ok(Self {
            name: sanitize_name(trimmed),
            start,
        })
    }

    /// The sanitized name, safe for object keys and directory names.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mission start in UTC.
    pub fn start(&self) -> Timestamp {
        self.start
    }

    /// Directory name under `missions/`, e.g. `2024-08-01T1930_Buckwheat-Ridge`.
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.start.strftime("%Y-%m-%dT%H%M"), self.name)
    }
}

/// Replaces whitespace and anything that isn't an ASCII letter, digit or dash with `-`.
pub fn sanitize_name(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Parses operator-supplied local time into a UTC instant.
///
/// `None` or blank input means "now", truncated to the minute.
pub fn parse_start_time(input: Option<&str>) -> Result<Timestamp, MissionError> {
    parse_start_time_in(input, &TimeZone::system())
}

/// Like [`parse_start_time`], with an explicit zone for the wall-clock input.
pub fn parse_start_time_in(input: Option<&str>, tz: &TimeZone) -> Result<Timestamp, MissionError> {
    let input = input.map(str::trim).filter(|s| !s.is_empty());
    let Some(input) = input else {
        return Ok(now_to_minute());
    };

    let invalid = |source| MissionError::InvalidTime {
        input: input.to_string(),
        source,
    };
    let civil = DateTime::strptime(START_TIME_FORMAT, input).map_err(invalid)?;
    let zoned = civil.to_zoned(tz.clone()).map_err(invalid)?;
    Ok(zoned.timestamp())
}

fn now_to_minute() -> Timestamp {
    let now = Timestamp::now().as_second();
    // Unix seconds are always representable after truncation.
    Timestamp::from_second(now - now.rem_euclid(60)).unwrap_or(Timestamp::UNIX_EPOCH)
}
