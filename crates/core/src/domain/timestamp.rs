// Lifecycle timestamps
//
// Stored as RFC 3339 in UTC with millisecond precision, which is also the
// precision of TimeProvider. Values are truncated to milliseconds on entry so
// that a save/load cycle reproduces them exactly.

use super::error::{DomainError, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

/// Drop sub-millisecond precision
pub fn normalize(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(3)
}

/// Convert epoch milliseconds into a UTC timestamp
pub fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

pub fn format(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp. Empty input means "absent".
pub fn parse(raw: &str) -> Result<Option<DateTime<Utc>>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|ts| Some(normalize(ts.with_timezone(&Utc))))
        .map_err(|e| DomainError::InvalidTimestamp {
            value: raw.to_string(),
            reason: e.to_string(),
        })
}
