//! Timestamp codec for the parking API.
//!
//! Request parameters and the snapshot `last_updated`/`last_downloaded`
//! fields use `yyyy-MM-ddTHH:mm:ss` without an offset. Snapshot times are
//! reported in UTC; forecast parameters are passed through as wall-clock
//! values.

use chrono::{DateTime, NaiveDateTime, Utc};

/// `strftime` pattern shared by every timestamp on the wire.
pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Formats a wall-clock time for use as a request parameter.
#[must_use]
pub fn format(value: &NaiveDateTime) -> String {
    value.format(FORMAT).to_string()
}

/// Parses a wire timestamp as a wall-clock time.
///
/// Some feeds append fractional seconds or an explicit offset; both are
/// accepted. An offset is dropped and the time is kept as written.
#[must_use]
pub fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

/// Parses a wire timestamp as UTC. Times without an offset are taken to be
/// UTC already; times with one are converted.
#[must_use]
pub fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| parse_naive(value).map(|naive| naive.and_utc()))
}

/// `serde(with = ...)` adapter for UTC timestamps in the wire format.
pub mod utc {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    /// # Errors
    ///
    /// Propagates the serializer's error.
    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(super::FORMAT))
    }

    /// # Errors
    ///
    /// Fails if the value is not a string in a recognized timestamp format.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_utc(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{raw}'")))
    }
}
