//! Weekly availability checks against a provider's calendar.

use chrono::{Datelike, NaiveDate, Weekday};
use serde_json::Value;

/// Lowercase English weekday name, the key used in provider calendars.
pub const fn weekday_key(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Whether the calendar marks the weekday of `date` as active.
///
/// Missing days and entries without a boolean `active` flag count as unavailable.
pub fn is_available_on(availabilities: &Value, date: NaiveDate) -> bool {
    availabilities
        .get(weekday_key(date.weekday()))
        .and_then(|day| day.get("active"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekday_key() {
        assert_eq!(weekday_key(Weekday::Mon), "monday");
        assert_eq!(weekday_key(Weekday::Sun), "sunday");
    }

    #[test]
    fn test_active_day_is_available() {
        // 2026-03-02 is a Monday
        let calendar = json!({"monday": {"active": true, "start": "08:00", "end": "17:00"}});
        assert!(is_available_on(&calendar, date(2026, 3, 2)));
    }

    #[test]
    fn test_inactive_or_missing_day() {
        let calendar = json!({"monday": {"active": false}, "tuesday": {}});
        assert!(!is_available_on(&calendar, date(2026, 3, 2)));
        assert!(!is_available_on(&calendar, date(2026, 3, 3)));
        assert!(!is_available_on(&calendar, date(2026, 3, 4)));
    }

    #[test]
    fn test_non_object_calendar() {
        assert!(!is_available_on(&Value::Null, date(2026, 3, 2)));
        assert!(!is_available_on(&json!([]), date(2026, 3, 2)));
    }

    #[test]
    fn test_non_boolean_flag_is_unavailable() {
        let calendar = json!({"monday": {"active": "yes"}});
        assert!(!is_available_on(&calendar, date(2026, 3, 2)));
    }
}
