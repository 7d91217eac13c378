//! Tags 0/1: datetime strings and epoch timestamps.
//!
//! The accepted wire format is `YYYY-MM-DDTHH:MM:SS[.fraction][Z|±HH:MM]`.
//! A missing timezone is a decode error for tag 0 — CBOR datetimes are
//! always timezone-aware on this wire.

use crate::error::{DecodeError, DecodeValueErrorKind};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use regex::Regex;
use std::sync::OnceLock;

fn timestamp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})(?:\.(\d+))?(?:Z|([+-]\d{2}):(\d{2}))$",
        )
        .expect("static datetime regex is valid")
    })
}

/// Parse an ISO-8601 datetime string per the wire format tag 0 uses.
/// Fractional seconds beyond microsecond precision are truncated, not
/// rounded: this decoder only carries microsecond precision.
pub fn parse_datetime_string(s: &str, offset: u64) -> Result<DateTime<FixedOffset>, DecodeError> {
    let caps = timestamp_re()
        .captures(s)
        .ok_or_else(|| DecodeError::value(offset, DecodeValueErrorKind::InvalidDatetime(s.to_string())))?;

    let get = |i: usize| caps.get(i).map(|m| m.as_str());
    let year: i32 = get(1).unwrap().parse().unwrap();
    let month: u32 = get(2).unwrap().parse().unwrap();
    let day: u32 = get(3).unwrap().parse().unwrap();
    let hour: u32 = get(4).unwrap().parse().unwrap();
    let minute: u32 = get(5).unwrap().parse().unwrap();
    let second: u32 = get(6).unwrap().parse().unwrap();

    let micros: u32 = match get(7) {
        Some(frac) => {
            let truncated: String = frac.chars().chain(std::iter::repeat('0')).take(6).collect();
            truncated.parse().unwrap_or(0)
        }
        None => 0,
    };

    let tz = match (get(8), get(9)) {
        (Some(h), Some(m)) => {
            let hours: i32 = h.parse().unwrap();
            let minutes: i32 = m.parse().unwrap();
            let total_minutes = hours.abs() * 60 + minutes;
            let sign = if hours < 0 { -1 } else { 1 };
            FixedOffset::east_opt(sign * total_minutes * 60).ok_or_else(|| {
                DecodeError::value(offset, DecodeValueErrorKind::InvalidDatetime(s.to_string()))
            })?
        }
        _ => FixedOffset::east_opt(0).unwrap(),
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| DecodeError::value(offset, DecodeValueErrorKind::InvalidDatetime(s.to_string())))?;
    let time = NaiveTime::from_hms_micro_opt(hour, minute, second, micros)
        .ok_or_else(|| DecodeError::value(offset, DecodeValueErrorKind::InvalidDatetime(s.to_string())))?;
    let naive = NaiveDateTime::new(date, time);

    tz.from_local_datetime(&naive)
        .single()
        .ok_or_else(|| DecodeError::value(offset, DecodeValueErrorKind::InvalidDatetime(s.to_string())))
}

/// Render a datetime the way tag 0 expects: ISO-8601 with `+00:00`
/// normalized to `Z`.
pub fn format_datetime_string(dt: &DateTime<FixedOffset>) -> String {
    let iso = if dt.nanosecond() % 1000 == 0 && dt.nanosecond() != 0 {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f%:z").to_string()
    } else if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.9f%:z").to_string()
    };
    iso.replace("+00:00", "Z")
}

/// Tag 1: epoch seconds, which may be an integer or a float on the wire.
pub fn epoch_to_datetime(seconds: f64, offset: u64) -> Result<DateTime<FixedOffset>, DecodeError> {
    let whole = seconds.trunc() as i64;
    let micros = ((seconds.fract()) * 1_000_000.0).round() as i64;
    chrono::Utc
        .timestamp_opt(whole, (micros.unsigned_abs() as u32) * 1000)
        .single()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| DecodeError::value(offset, DecodeValueErrorKind::InvalidDatetime(seconds.to_string())))
}

pub fn datetime_to_epoch(dt: &DateTime<FixedOffset>) -> f64 {
    dt.timestamp() as f64 + (dt.timestamp_subsec_micros() as f64 / 1_000_000.0)
}

/// Midnight UTC on the given date, the wire value tag 0 uses for a bare date.
pub fn date_to_midnight_utc(date: NaiveDate) -> DateTime<FixedOffset> {
    let naive = date.and_hms_opt(0, 0, 0).expect("midnight always valid");
    FixedOffset::east_opt(0)
        .unwrap()
        .from_utc_datetime(&naive)
}
