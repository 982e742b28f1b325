//! Timestamp and identifier helpers.
//!
//! Timestamps are stored as RFC 3339 UTC strings with second precision so
//! that lexical ordering in SQLite matches chronological ordering.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::domain::DomainError;

pub fn now_rfc3339() -> String {
    to_rfc3339(Utc::now())
}

pub fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Parse a client supplied timestamp and normalise it to the storage format.
pub fn normalize_timestamp(value: &str) -> Result<String, DomainError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| to_rfc3339(ts.with_timezone(&Utc)))
        .map_err(|_| DomainError::Validation(format!("invalid timestamp '{}'", value)))
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| DomainError::Validation(format!("invalid date '{}'", value)))
}
