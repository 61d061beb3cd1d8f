//! Working-hours strings as clinics enter them, e.g.
//! `"Monday-Friday: 10:00 AM - 5:00 PM, Saturday: 10:00 AM - 2:00 PM"`.
//!
//! Ranges are separated by `", "`. A day part with a single hyphen is an
//! inclusive weekday range; more hyphens make it a list of days
//! (`"Monday-Wednesday-Friday"`).

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use tracing::debug;

use shared_utils::time::parse_clock_time;

use crate::models::UserSettings;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl DailyHours {
    /// Both ends included. Used for opening hours and for lunch, so a
    /// 1-2 PM lunch also blocks 2:00 PM.
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time <= self.end
    }

    /// A shift takes appointments starting at its opening but not at its close.
    pub fn admits_start(&self, time: NaiveTime) -> bool {
        self.start <= time && time < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoursCheck {
    Open,
    NotConfigured,
    ClosedThatDay,
    OutsideHours,
    LunchBreak,
}

impl HoursCheck {
    pub fn is_open(&self) -> bool {
        matches!(self, HoursCheck::Open)
    }
}

fn parse_days(days_part: &str) -> Option<Vec<Weekday>> {
    let days_part = days_part.trim();

    if days_part.contains('-') && !days_part.contains(" - ") {
        let names: Vec<&str> = days_part.split('-').map(str::trim).collect();
        if names.len() == 2 {
            let start: Weekday = names[0].parse().ok()?;
            let end: Weekday = names[1].parse().ok()?;
            let start_idx = start.num_days_from_monday() as usize;
            let end_idx = end.num_days_from_monday() as usize;
            if start_idx > end_idx {
                return Some(Vec::new());
            }
            return Some(WEEK[start_idx..=end_idx].to_vec());
        }
        return names.iter().map(|name| name.parse::<Weekday>().ok()).collect();
    }

    days_part.parse::<Weekday>().ok().map(|day| vec![day])
}

/// Hours that apply on `date`, or `None` when the string has no range for
/// that weekday.
pub fn parse_working_hours(hours_text: &str, date: NaiveDate) -> Option<DailyHours> {
    let weekday = date.weekday();

    for range in hours_text.split(", ") {
        let Some((days_part, hours_part)) = range.split_once(':') else {
            continue;
        };

        let Some(days) = parse_days(days_part) else {
            debug!("Skipping unparseable day range '{}'", days_part.trim());
            continue;
        };
        if !days.contains(&weekday) {
            continue;
        }

        let Some((start, end)) = hours_part.trim().split_once(" - ") else {
            continue;
        };
        match (parse_clock_time(start), parse_clock_time(end)) {
            (Ok(start), Ok(end)) => return Some(DailyHours { start, end }),
            _ => {
                debug!("Skipping unparseable hours '{}'", hours_part.trim());
                continue;
            }
        }
    }

    None
}

pub fn lunch_break(settings: &UserSettings, date: NaiveDate) -> Option<DailyHours> {
    settings
        .lunch_hours
        .as_deref()
        .and_then(|hours_text| parse_working_hours(hours_text, date))
}

/// Whether the clinic as a whole accepts appointments at `time` on `date`.
pub fn check_clinic_hours(settings: &UserSettings, date: NaiveDate, time: NaiveTime) -> HoursCheck {
    let Some(hours_text) = settings.working_hours.as_deref().filter(|s| !s.trim().is_empty()) else {
        return HoursCheck::NotConfigured;
    };

    let Some(hours) = parse_working_hours(hours_text, date) else {
        return HoursCheck::ClosedThatDay;
    };

    if !hours.contains(time) {
        return HoursCheck::OutsideHours;
    }

    if lunch_break(settings, date).map(|l| l.contains(time)).unwrap_or(false) {
        return HoursCheck::LunchBreak;
    }

    HoursCheck::Open
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn settings(working: Option<&str>, lunch: Option<&str>) -> UserSettings {
        serde_json::from_value(json!({
            "user_id": "u1",
            "doctor_details": [],
            "working_hours": working,
            "lunch_hours": lunch
        }))
        .unwrap()
    }

    // 2024-03-04 is a Monday.
    const MONDAY: &str = "2024-03-04";
    const WEDNESDAY: &str = "2024-03-06";
    const SATURDAY: &str = "2024-03-09";
    const SUNDAY: &str = "2024-03-10";

    #[test]
    fn test_simple_range() {
        let hours = parse_working_hours("Monday-Saturday: 9:00 AM - 6:00 PM", date(SATURDAY)).unwrap();
        assert_eq!(hours.start, time(9, 0));
        assert_eq!(hours.end, time(18, 0));
        assert!(parse_working_hours("Monday-Saturday: 9:00 AM - 6:00 PM", date(SUNDAY)).is_none());
    }

    #[test]
    fn test_multiple_ranges_and_single_day() {
        let hours_text = "Monday-Friday: 10:00 AM - 5:00 PM, Saturday: 10:00 AM - 2:00 PM";
        assert_eq!(parse_working_hours(hours_text, date(MONDAY)).unwrap().end, time(17, 0));
        assert_eq!(parse_working_hours(hours_text, date(SATURDAY)).unwrap().end, time(14, 0));
        assert!(parse_working_hours(hours_text, date(SUNDAY)).is_none());
    }

    #[test]
    fn test_day_list() {
        let hours_text = "Monday-Wednesday-Friday: 11:00 AM - 7:00 PM, Tuesday-Thursday: 2:00 PM - 8:00 PM";
        assert_eq!(parse_working_hours(hours_text, date(WEDNESDAY)).unwrap().start, time(11, 0));
        // Two names form a range; Wednesday also falls in it but the first match wins.
        assert_eq!(parse_working_hours(hours_text, date("2024-03-05")).unwrap().start, time(14, 0));
        assert!(parse_working_hours(hours_text, date(SATURDAY)).is_none());
    }

    #[test]
    fn test_garbage_is_closed() {
        assert!(parse_working_hours("whenever", date(MONDAY)).is_none());
        assert!(parse_working_hours("Funday: 9:00 AM - 5:00 PM", date(MONDAY)).is_none());
    }

    #[test]
    fn test_clinic_hours_check() {
        let s = settings(
            Some("Monday-Saturday: 9:00 AM - 7:00 PM"),
            Some("Monday-Saturday: 1:00 PM - 2:00 PM"),
        );

        assert_eq!(check_clinic_hours(&s, date(MONDAY), time(10, 0)), HoursCheck::Open);
        assert_eq!(check_clinic_hours(&s, date(MONDAY), time(19, 0)), HoursCheck::Open);
        assert_eq!(check_clinic_hours(&s, date(MONDAY), time(8, 30)), HoursCheck::OutsideHours);
        assert_eq!(check_clinic_hours(&s, date(MONDAY), time(13, 30)), HoursCheck::LunchBreak);
        assert_eq!(check_clinic_hours(&s, date(MONDAY), time(13, 0)), HoursCheck::LunchBreak);
        assert_eq!(check_clinic_hours(&s, date(MONDAY), time(14, 0)), HoursCheck::LunchBreak);
        assert_eq!(check_clinic_hours(&s, date(MONDAY), time(14, 30)), HoursCheck::Open);
        assert_eq!(check_clinic_hours(&s, date(SUNDAY), time(10, 0)), HoursCheck::ClosedThatDay);
    }

    #[test]
    fn test_missing_hours_never_open() {
        let s = settings(None, None);
        assert_eq!(check_clinic_hours(&s, date(MONDAY), time(10, 0)), HoursCheck::NotConfigured);
        assert!(!HoursCheck::NotConfigured.is_open());
    }
}
