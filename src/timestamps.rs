use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, SubsecRound, TimeZone, Utc,
};
use chrono_tz::America::New_York;
use thiserror::Error;

/// Formats that carry their own UTC offset. RFC 3339 is tried before these.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
];

/// Formats without an offset; the business timezone is assumed.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimestampError {
    #[error("Unparseable timestamp: {0:?}")]
    Unparseable(String),
}

/// UTC offset of the business timezone at `now`.
pub fn business_offset(now: DateTime<Utc>) -> FixedOffset {
    now.with_timezone(&New_York).offset().fix()
}

/// Business timezone offset in whole hours with an explicit sign, e.g. `-04` in summer
/// and `-05` in winter.
pub fn local_utc_offset_hours(now: DateTime<Utc>) -> String {
    let hours = business_offset(now).local_minus_utc() / 3600;
    format!("{:+03}", hours)
}

/// Parse a free-form timestamp. Missing time-of-day defaults to midnight and a missing
/// offset defaults to `default_offset`. The result has whole-second precision.
pub fn parse_timestamp(
    text: Option<&str>,
    default_offset: FixedOffset,
) -> Result<Option<DateTime<FixedOffset>>, TimestampError> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    if let Some(dt) = parse_with_offset(text) {
        return Ok(Some(dt.trunc_subsecs(0)));
    }

    let Some(naive) = parse_naive(text) else {
        return Err(TimestampError::Unparseable(text.to_string()));
    };
    let local = default_offset.from_utc_datetime(&(naive - default_offset));
    Ok(Some(local.trunc_subsecs(0)))
}

fn parse_with_offset(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }
    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(text, fmt).ok())
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// `end - start`, signed, when both ends are known.
pub fn duration(
    start: Option<DateTime<FixedOffset>>,
    end: Option<DateTime<FixedOffset>>,
) -> Option<Duration> {
    match (start, end) {
        (Some(start), Some(end)) => Some(end - start),
        _ => None,
    }
}
