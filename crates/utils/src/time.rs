//! Timestamp handling shared by the storage adapters and the HTTP layer.
//!
//! Every instant is stored and compared in UTC. On the wire an instant is an
//! RFC 3339 string with a `Z` suffix, and fractional seconds appear only when
//! they are non-zero.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parses a device-reported timestamp.
///
/// Accepts RFC 3339 with any offset, a naive date-time (read as UTC), or a
/// bare calendar date (UTC midnight).
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }
    parse_date(raw).map(start_of_day)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Last representable millisecond of `date` in UTC.
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .map(|value| value.and_utc())
        .unwrap_or_else(|| start_of_day(date))
}

/// Lower bound of a history filter: a calendar date means its first instant.
pub fn parse_range_start(raw: &str) -> Option<DateTime<Utc>> {
    match parse_date(raw) {
        Some(date) => Some(start_of_day(date)),
        None => DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|value| value.with_timezone(&Utc)),
    }
}

/// Upper bound of a history filter: a calendar date is widened to its last
/// millisecond so the whole day is included.
pub fn parse_range_end(raw: &str) -> Option<DateTime<Utc>> {
    match parse_date(raw) {
        Some(date) => Some(end_of_day(date)),
        None => DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|value| value.with_timezone(&Utc)),
    }
}

/// `#[serde(with = "utils::time::rfc3339")]` for `DateTime<Utc>` fields.
pub mod rfc3339 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_instant(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }
}
