//! Wire format for pickup timestamps.
//!
//! Clients send either RFC 3339 (normalized to UTC) or a naive ISO 8601 local
//! timestamp with optional seconds. Values are kept at second precision and
//! written back as `YYYY-MM-DDTHH:MM:SS`.

use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
use time::{
    format_description::{well_known::Rfc3339, BorrowedFormatItem},
    macros::format_description,
    OffsetDateTime, PrimitiveDateTime, UtcOffset,
};

const NAIVE: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const NAIVE_FRACTION: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
const NAIVE_MINUTES: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");
const SMS: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute] [day]/[month]/[year repr:last_two]");

pub fn parse(raw: &str) -> Option<PrimitiveDateTime> {
    let raw = raw.trim();
    let parsed = OffsetDateTime::parse(raw, &Rfc3339)
        .map(|dt| {
            let utc = dt.to_offset(UtcOffset::UTC);
            PrimitiveDateTime::new(utc.date(), utc.time())
        })
        .or_else(|_| PrimitiveDateTime::parse(raw, NAIVE))
        .or_else(|_| PrimitiveDateTime::parse(raw, NAIVE_FRACTION))
        .or_else(|_| PrimitiveDateTime::parse(raw, NAIVE_MINUTES))
        .ok()?;
    parsed.replace_nanosecond(0).ok()
}

pub fn format(dt: PrimitiveDateTime) -> String {
    dt.format(NAIVE).unwrap_or_else(|_| dt.to_string())
}

/// `HH:MM dd/mm/yy`, as shown in confirmation messages.
pub fn format_short(dt: PrimitiveDateTime) -> String {
    dt.format(SMS).unwrap_or_else(|_| dt.to_string())
}

pub fn serialize<S: Serializer>(dt: &PrimitiveDateTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format(*dt))
}

pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<PrimitiveDateTime, D::Error> {
    let raw = String::deserialize(d)?;
    parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn accepts_naive_forms() {
        assert_eq!(parse("2025-01-01T10:00"), Some(datetime!(2025-01-01 10:00)));
        assert_eq!(parse("2025-01-01T10:00:30"), Some(datetime!(2025-01-01 10:00:30)));
        assert_eq!(parse("2025-01-01T10:00:30.250"), Some(datetime!(2025-01-01 10:00:30)));
    }

    #[test]
    fn normalizes_offsets_to_utc() {
        assert_eq!(parse("2025-01-01T10:00:00-03:00"), Some(datetime!(2025-01-01 13:00)));
        assert_eq!(parse("2025-01-01T10:00:00Z"), Some(datetime!(2025-01-01 10:00)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse("tomorrow"), None);
        assert_eq!(parse("2025-13-01T10:00"), None);
    }

    #[test]
    fn formats() {
        let dt = datetime!(2025-01-01 09:05);
        assert_eq!(format(dt), "2025-01-01T09:05:00");
        assert_eq!(format_short(dt), "09:05 01/01/25");
    }
}
