//! Clock handling for the clinic. All appointment dates and times are
//! clinic-local (IST, UTC+05:30); the database stores times as `HH:MM:SS`.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Timelike, Utc};
use regex::Regex;
use thiserror::Error;

pub const IST_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;
pub const CLINIC_TIMEZONE: &str = "Asia/Kolkata";

static ISO_TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").unwrap());
static TWELVE_HOUR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d{1,2})(?::(\d{2}))?(?::(\d{2}))?\s*(a\.?m\.?|p\.?m\.?)\s*$").unwrap()
});
static TWENTY_FOUR_HOUR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,2}):(\d{2})(?::(\d{2}))?\s*$").unwrap());

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeFormatError {
    #[error("Time format not recognized: {0}")]
    UnrecognizedTime(String),

    #[error("Date format not recognized: {0} (expected YYYY-MM-DD)")]
    UnrecognizedDate(String),
}

pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
}

pub fn convert_to_ist(dt: DateTime<Utc>) -> DateTime<FixedOffset> {
    dt.with_timezone(&ist())
}

pub fn now_ist() -> DateTime<FixedOffset> {
    convert_to_ist(Utc::now())
}

pub fn today_ist() -> NaiveDate {
    now_ist().date_naive()
}

/// Parse the loose time formats callers and language models produce:
/// ISO timestamps, `h:mm[:ss] AM/PM`, `H:MM` and `H:MM:SS`.
pub fn parse_clock_time(input: &str) -> Result<NaiveTime, TimeFormatError> {
    let trimmed = input.trim();
    let unrecognized = || TimeFormatError::UnrecognizedTime(input.to_string());

    if ISO_TIMESTAMP.is_match(trimmed) {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&trimmed.replace('Z', "+00:00")) {
            return Ok(dt.time().with_nanosecond(0).unwrap_or(dt.time()));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(dt.time().with_nanosecond(0).unwrap_or(dt.time()));
        }
    }

    if let Some(caps) = TWELVE_HOUR.captures(trimmed) {
        let hour: u32 = caps[1].parse().map_err(|_| unrecognized())?;
        let minute: u32 = caps.get(2).map_or(Ok(0), |m| m.as_str().parse()).map_err(|_| unrecognized())?;
        let second: u32 = caps.get(3).map_or(Ok(0), |m| m.as_str().parse()).map_err(|_| unrecognized())?;
        if !(1..=12).contains(&hour) {
            return Err(unrecognized());
        }

        let is_pm = caps[4].to_ascii_lowercase().starts_with('p');
        let hour = match (is_pm, hour) {
            (true, 12) => 12,
            (true, h) => h + 12,
            (false, 12) => 0,
            (false, h) => h,
        };
        return NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(unrecognized);
    }

    if let Some(caps) = TWENTY_FOUR_HOUR.captures(trimmed) {
        let hour: u32 = caps[1].parse().map_err(|_| unrecognized())?;
        let minute: u32 = caps[2].parse().map_err(|_| unrecognized())?;
        let second: u32 = caps.get(3).map_or(Ok(0), |m| m.as_str().parse()).map_err(|_| unrecognized())?;
        return NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(unrecognized);
    }

    Err(unrecognized())
}

/// Normalise a time to the `HH:MM:SS` form stored in the database.
pub fn format_time_for_db(input: &str) -> Result<String, TimeFormatError> {
    parse_clock_time(input).map(|t| db_time(&t))
}

pub fn db_time(time: &NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

/// `14:00:00` becomes `2:00 PM`. Unparseable input is spoken as given.
pub fn format_time_for_speech(input: &str) -> String {
    match parse_clock_time(input) {
        Ok(time) => speech_time(&time),
        Err(_) => input.to_string(),
    }
}

pub fn speech_time(time: &NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

pub fn parse_date(input: &str) -> Result<NaiveDate, TimeFormatError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| TimeFormatError::UnrecognizedDate(input.to_string()))
}

/// Clinic-local wall time rendered for the Google Calendar API,
/// e.g. `2024-03-04T10:30:00+05:30`.
pub fn calendar_datetime(date: NaiveDate, time: NaiveTime) -> String {
    let naive = date.and_time(time);
    match ist().from_local_datetime(&naive).single() {
        Some(dt) => dt.to_rfc3339(),
        None => format!("{}+05:30", naive.format("%Y-%m-%dT%H:%M:%S")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_format_time_for_db_accepts_common_forms() {
        assert_eq!(format_time_for_db("14:30").unwrap(), "14:30:00");
        assert_eq!(format_time_for_db("9:05").unwrap(), "09:05:00");
        assert_eq!(format_time_for_db("14:30:45").unwrap(), "14:30:45");
        assert_eq!(format_time_for_db("2:30 PM").unwrap(), "14:30:00");
        assert_eq!(format_time_for_db("2:30pm").unwrap(), "14:30:00");
        assert_eq!(format_time_for_db("12:15 AM").unwrap(), "00:15:00");
        assert_eq!(format_time_for_db("12:00 PM").unwrap(), "12:00:00");
        assert_eq!(format_time_for_db("11 AM").unwrap(), "11:00:00");
        assert_eq!(format_time_for_db("2024-03-04T10:30:00").unwrap(), "10:30:00");
        assert_eq!(format_time_for_db("2024-03-04T10:30:00Z").unwrap(), "10:30:00");
    }

    #[test]
    fn test_format_time_for_db_rejects_garbage() {
        assert_matches!(format_time_for_db("tomorrow"), Err(TimeFormatError::UnrecognizedTime(_)));
        assert_matches!(format_time_for_db("25:00"), Err(TimeFormatError::UnrecognizedTime(_)));
        assert_matches!(format_time_for_db("13:00 PM"), Err(TimeFormatError::UnrecognizedTime(_)));
    }

    #[test]
    fn test_format_time_for_speech() {
        assert_eq!(format_time_for_speech("14:00:00"), "2:00 PM");
        assert_eq!(format_time_for_speech("09:30:00"), "9:30 AM");
        assert_eq!(format_time_for_speech("00:00:00"), "12:00 AM");
        assert_eq!(format_time_for_speech("noonish"), "noonish");
    }

    #[test]
    fn test_calendar_datetime_is_ist() {
        let date = parse_date("2024-03-04").unwrap();
        let time = parse_clock_time("10:30").unwrap();
        assert_eq!(calendar_datetime(date, time), "2024-03-04T10:30:00+05:30");
    }

    #[test]
    fn test_convert_to_ist_shifts_offset() {
        let utc = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
        let local = convert_to_ist(utc);
        assert_eq!(local.format("%H:%M").to_string(), "17:30");
    }

    #[test]
    fn test_parse_date() {
        assert!(parse_date("2024-02-29").is_ok());
        assert_matches!(parse_date("04/03/2024"), Err(TimeFormatError::UnrecognizedDate(_)));
    }
}
