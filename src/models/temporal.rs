//! Canonical temporal values.
//!
//! Some tables only carry a calendar date (conditions, care plans) while
//! others carry full UTC timestamps. Both are kept as-is; nothing is widened
//! to a fake midnight timestamp or truncated to a date.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unrecognised date/time value: {0:?}")]
pub struct TemporalParseError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Temporal {
    Date(NaiveDate),
    /// Always UTC.
    DateTime(NaiveDateTime),
}

impl Temporal {
    /// Parse the formats found in the source tables.
    ///
    /// Accepted: `2019-02-17`, `2019-02-17T05:07:38Z`, `2019-02-17T05:07:38`,
    /// `2019-02-17 05:07:38`, and RFC 3339 with an explicit offset (converted
    /// to UTC).
    pub fn parse(raw: &str) -> Result<Self, TemporalParseError> {
        let s = raw.trim();

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Temporal::Date(date));
        }

        let naive = s.strip_suffix('Z').unwrap_or(s);
        for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
                return Ok(Temporal::DateTime(dt));
            }
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Temporal::DateTime(dt.with_timezone(&Utc).naive_utc()));
        }

        Err(TemporalParseError(raw.to_string()))
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            Temporal::Date(d) => *d,
            Temporal::DateTime(dt) => dt.date(),
        }
    }

    pub fn is_date_only(&self) -> bool {
        matches!(self, Temporal::Date(_))
    }

    /// Sort position on the timeline; a bare date sits at the start of its day.
    fn instant(&self) -> NaiveDateTime {
        match self {
            Temporal::Date(d) => d.and_time(NaiveTime::MIN),
            Temporal::DateTime(dt) => *dt,
        }
    }

    /// Order by timeline position only. A bare date and a midnight timestamp
    /// of the same day compare equal, so a stable sort keeps their row order.
    pub fn timeline_cmp(&self, other: &Self) -> Ordering {
        self.instant().cmp(&other.instant())
    }
}

impl Ord for Temporal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant()
            .cmp(&other.instant())
            .then_with(|| other.is_date_only().cmp(&self.is_date_only()))
    }
}

impl PartialOrd for Temporal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Temporal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Temporal::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Temporal::DateTime(dt) => write!(f, "{} UTC", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}
