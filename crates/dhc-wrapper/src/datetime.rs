//! HL7 <-> ISO8601 datetime conversion
//!
//! HL7 timestamps come in truncated forms (`YYYYMMDD`, `YYYYMMDDhhmm`,
//! `YYYYMMDDhhmmss[.ffff][±zzzz]`). Values without a zone adopt a caller
//! supplied default zone. Outgoing timestamps are rendered with the
//! trustomer-configured strftime format, where `%L` is a non-standard
//! directive for the three-digit millisecond fraction.

use chrono::{
    DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
    Utc,
};
use chrono_tz::Tz;
use thiserror::Error;

/// Result type alias for datetime conversions
pub type Result<T> = std::result::Result<T, DatetimeError>;

#[derive(Error, Debug)]
pub enum DatetimeError {
    #[error("Could not parse HL7 timestamp '{0}'")]
    InvalidHl7Timestamp(String),

    #[error("Could not parse ISO8601 timestamp '{0}'")]
    InvalidIso8601(String),

    #[error("Ambiguous or non-existent local time '{0}'")]
    AmbiguousLocalTime(String),
}

/// A parsed HL7 timestamp, before zone resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hl7Timestamp {
    pub naive: NaiveDateTime,
    pub offset: Option<FixedOffset>,
    /// True when the value carried a date with no time part
    pub date_only: bool,
}

/// Parse an HL7 TS value
pub fn parse_hl7_timestamp(value: &str) -> Result<Hl7Timestamp> {
    let err = || DatetimeError::InvalidHl7Timestamp(value.to_string());

    if value.len() < 8 {
        return Err(err());
    }

    // Split off a trailing ±zzzz zone, if any. The sign can only occur
    // after the date digits.
    let (body, offset) = match value[1..].find(['+', '-']) {
        Some(pos) => {
            let (body, zone) = value.split_at(pos + 1);
            (body, Some(parse_zone(zone).ok_or_else(err)?))
        }
        None => (value, None),
    };

    let (digits, fraction) = match body.split_once('.') {
        Some((digits, fraction)) => (digits, Some(fraction)),
        None => (body, None),
    };

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(err());
    }

    let date = match digits.len() {
        8 | 12 | 14 => NaiveDate::parse_from_str(&digits[..8], "%Y%m%d").map_err(|_| err())?,
        _ => return Err(err()),
    };

    let time = match digits.len() {
        8 => NaiveTime::from_hms_opt(0, 0, 0).ok_or_else(err)?,
        12 => NaiveTime::parse_from_str(&digits[8..], "%H%M").map_err(|_| err())?,
        14 => NaiveTime::parse_from_str(&digits[8..], "%H%M%S").map_err(|_| err())?,
        _ => unreachable!(),
    };

    let mut naive = NaiveDateTime::new(date, time);

    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
        let millis: u32 = format!("{:0<3}", fraction)[..3].parse().map_err(|_| err())?;
        naive += chrono::Duration::milliseconds(i64::from(millis));
    }

    Ok(Hl7Timestamp {
        naive,
        offset,
        date_only: digits.len() == 8,
    })
}

fn parse_zone(zone: &str) -> Option<FixedOffset> {
    let (sign, digits) = zone.split_at(1);
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    let seconds = (hours * 60 + minutes) * 60;
    match sign {
        "+" => FixedOffset::east_opt(seconds),
        "-" => FixedOffset::west_opt(seconds),
        _ => None,
    }
}

/// Resolve an HL7 timestamp to an ISO8601 instant string
///
/// Values carrying an explicit zone keep it; zoneless values are localised
/// in `default_tz`. Zero offsets render as `Z`.
pub fn hl7_to_iso8601_datetime(value: &str, default_tz: Tz) -> Result<String> {
    let ts = parse_hl7_timestamp(value)?;

    match ts.offset {
        Some(offset) => {
            let dt = offset
                .from_local_datetime(&ts.naive)
                .single()
                .ok_or_else(|| DatetimeError::AmbiguousLocalTime(value.to_string()))?;
            Ok(format_iso8601(&dt))
        }
        None => {
            let dt = match default_tz.from_local_datetime(&ts.naive) {
                LocalResult::Single(dt) => dt,
                LocalResult::Ambiguous(dt, _) => dt,
                LocalResult::None => {
                    return Err(DatetimeError::AmbiguousLocalTime(value.to_string()))
                }
            };
            Ok(format_iso8601(&dt.fixed_offset()))
        }
    }
}

/// Resolve an HL7 timestamp to an ISO8601 date string (`YYYY-MM-DD`)
pub fn hl7_to_iso8601_date(value: &str) -> Result<String> {
    let ts = parse_hl7_timestamp(value)?;
    Ok(ts.naive.date().format("%Y-%m-%d").to_string())
}

/// Render an instant as ISO8601 with millisecond precision
pub fn format_iso8601(dt: &DateTime<FixedOffset>) -> String {
    if dt.offset().fix().local_minus_utc() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
    }
}

/// Parse an ISO8601 instant, tolerating `Z`, `+00:00` and `+0000` zones
pub fn parse_iso8601(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map_err(|_| DatetimeError::InvalidIso8601(value.to_string()))
}

/// Render an instant in the HL7 outgoing format, in the server timezone
///
/// `%L` in the format is substituted with the three-digit millisecond
/// fraction before delegating to the standard formatter.
pub fn iso8601_to_hl7(value: &str, server_tz: Tz, format: &str) -> Result<String> {
    let dt = parse_iso8601(value)?.with_timezone(&server_tz);
    Ok(format_hl7_datetime(&dt, format))
}

/// Current time in the HL7 outgoing format, in the server timezone
pub fn hl7_datetime_now(server_tz: Tz, format: &str) -> String {
    format_hl7_datetime(&Utc::now().with_timezone(&server_tz), format)
}

/// Format a zoned instant using the outgoing format, handling `%L`
pub fn format_hl7_datetime(dt: &DateTime<Tz>, format: &str) -> String {
    if format.contains("%L") {
        let millis = format!("{:03}", dt.timestamp_subsec_millis());
        return format
            .split("%L")
            .map(|section| dt.format(section).to_string())
            .collect::<Vec<_>>()
            .join(&millis);
    }
    dt.format(format).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_only() {
        let ts = parse_hl7_timestamp("19821103").unwrap();
        assert!(ts.date_only);
        assert_eq!(ts.naive.date().format("%Y-%m-%d").to_string(), "1982-11-03");
    }

    #[test]
    fn test_parse_minutes_precision() {
        let ts = parse_hl7_timestamp("201707311413").unwrap();
        assert!(!ts.date_only);
        assert_eq!(ts.offset, None);
        assert_eq!(
            ts.naive.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2017-07-31 14:13:00"
        );
    }

    #[test]
    fn test_parse_full_with_fraction_and_zone() {
        let ts = parse_hl7_timestamp("20190130130626.870+0000").unwrap();
        assert_eq!(ts.offset, FixedOffset::east_opt(0));
        assert_eq!(
            ts.naive.format("%H:%M:%S%.3f").to_string(),
            "13:06:26.870"
        );
    }

    #[test]
    fn test_parse_negative_zone() {
        let ts = parse_hl7_timestamp("20191111111111.111-0700").unwrap();
        assert_eq!(ts.offset, FixedOffset::west_opt(7 * 3600));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_hl7_timestamp("").is_err());
        assert!(parse_hl7_timestamp("2017").is_err());
        assert!(parse_hl7_timestamp("banana").is_err());
        assert!(parse_hl7_timestamp("20170731+01").is_err());
    }

    #[test]
    fn test_hl7_to_iso8601_utc() {
        let iso = hl7_to_iso8601_datetime("20170731141348", chrono_tz::UTC).unwrap();
        assert_eq!(iso, "2017-07-31T14:13:48.000Z");
    }

    #[test]
    fn test_hl7_to_iso8601_localised() {
        let iso =
            hl7_to_iso8601_datetime("201707311413", chrono_tz::Europe::London).unwrap();
        assert_eq!(iso, "2017-07-31T14:13:00.000+01:00");
    }

    #[test]
    fn test_hl7_to_iso8601_explicit_zone_wins() {
        let iso =
            hl7_to_iso8601_datetime("20190130130626.870+0000", chrono_tz::Europe::London)
                .unwrap();
        assert_eq!(iso, "2019-01-30T13:06:26.870Z");
    }

    #[test]
    fn test_hl7_to_iso8601_date() {
        assert_eq!(hl7_to_iso8601_date("19821103").unwrap(), "1982-11-03");
        assert_eq!(
            hl7_to_iso8601_date("20170731141300").unwrap(),
            "2017-07-31"
        );
    }

    #[test]
    fn test_iso8601_to_hl7_short_format() {
        let hl7 = iso8601_to_hl7(
            "2019-10-22T00:02:03.456+0000",
            chrono_tz::UTC,
            "%Y%m%d%H%M%S",
        )
        .unwrap();
        assert_eq!(hl7, "20191022000203");
    }

    #[test]
    fn test_iso8601_to_hl7_millisecond_directive() {
        let hl7 = iso8601_to_hl7(
            "2019-10-22T01:02:03.456+0100",
            chrono_tz::UTC,
            "%Y%m%d%H%M%S.%L%z",
        )
        .unwrap();
        assert_eq!(hl7, "20191022000203.456+0000");
    }

    #[test]
    fn test_iso8601_to_hl7_converts_into_server_zone() {
        let hl7 = iso8601_to_hl7(
            "2019-08-22T01:02:03.456+0100",
            chrono_tz::US::Eastern,
            "%Y%m%d%H%M%S",
        )
        .unwrap();
        assert_eq!(hl7, "20190821200203");
    }

    #[test]
    fn test_parse_iso8601_zone_spellings() {
        assert!(parse_iso8601("2019-10-22T00:02:03.456Z").is_ok());
        assert!(parse_iso8601("2019-10-22T00:02:03.456+00:00").is_ok());
        assert!(parse_iso8601("2019-10-22T00:02:03.456+0000").is_ok());
        assert!(parse_iso8601("not-a-date").is_err());
    }
}
