//! Canonical snapshot timestamp encoding
//!
//! Provenance compares a tag value written in an earlier run against the
//! creation time of the current source snapshot. Both sides go through this
//! type so formatting differences never read as "stale".

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Legacy `str(datetime)` rendering, e.g. `2024-01-01 10:00:00.123000+00:00`.
/// `%.f` also accepts a missing fraction.
const LEGACY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%:z";

/// Snapshot creation time, always held in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotTime(DateTime<Utc>);

impl SnapshotTime {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    /// Build from seconds and nanoseconds since the Unix epoch
    pub fn from_unix(secs: i64, nanos: u32) -> Option<Self> {
        DateTime::from_timestamp(secs, nanos).map(Self)
    }

    /// RFC 3339, UTC with `Z`, fixed microsecond precision
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use snapcopy_core::model::SnapshotTime;
    ///
    /// let t = SnapshotTime::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    /// assert_eq!(t.canonical(), "2024-01-01T00:00:00.000000Z");
    /// ```
    pub fn canonical(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Parse a recorded value in canonical, any RFC 3339, or legacy form
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        DateTime::parse_from_rfc3339(value)
            .or_else(|_| DateTime::parse_from_str(value, LEGACY_FORMAT))
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }

    /// Equality contract against a previously recorded value
    ///
    /// Values compare as instants at microsecond precision. An unparsable
    /// value never matches, since the canonical form always parses.
    pub fn matches_recorded(&self, recorded: &str) -> bool {
        Self::parse(recorded)
            .is_some_and(|other| self.truncated_micros() == other.truncated_micros())
    }

    fn truncated_micros(&self) -> i64 {
        self.0.timestamp_micros()
    }
}

impl From<DateTime<Utc>> for SnapshotTime {
    fn from(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl std::fmt::Display for SnapshotTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}
