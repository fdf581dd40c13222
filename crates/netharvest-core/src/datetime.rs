//! Calendar arithmetic and timezone-aware date parsing
//!
//! The appliance APIs emit date/time strings in several layouts, some with
//! bare zone abbreviations ("EDT") that only a configured abbreviation →
//! IANA table can disambiguate. Relative-time expressions (signed calendar
//! offsets plus absolute field overrides) drive both the `date_injection`
//! resolver and the KPI query windows.

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::{DateTime, Datelike as _, NaiveDate, NaiveDateTime, TimeZone as _, Timelike as _};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Accepted date/time layouts, tried in order after any zone abbreviation
/// has been pulled out of the string.
const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    // e.g. "Sun Aug 26 00:00:00 2018" once the abbreviation is removed
    "%a %b %d %H:%M:%S %Y",
    // trend point stamps, e.g. "2018-Oct-30_11:09"
    "%Y-%b-%d_%H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// Date-only layouts, midnight assumed.
const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y"];

/// A signed calendar offset applied to a reference instant.
///
/// Years and months are whole units; days, hours, minutes and seconds
/// accept fractional values whose fraction cascades into the smaller units
/// (1.5 days = 1 day 12 hours).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RelativeDelta {
    /// Whole years, signed
    #[serde(default)]
    pub years: i32,
    /// Whole months, signed
    #[serde(default)]
    pub months: i32,
    /// Days, signed, fractional allowed
    #[serde(default)]
    pub days: f64,
    /// Hours, signed, fractional allowed
    #[serde(default)]
    pub hours: f64,
    /// Minutes, signed, fractional allowed
    #[serde(default)]
    pub minutes: f64,
    /// Seconds, signed, fractional allowed
    #[serde(default)]
    pub seconds: f64,
}

impl RelativeDelta {
    /// Apply the offset to an instant. Month arithmetic clamps to the end
    /// of the target month (Jan 31 + 1 month = Feb 28/29).
    pub fn apply(&self, instant: DateTime<Tz>) -> Option<DateTime<Tz>> {
        let total_months = i64::from(self.years) * 12 + i64::from(self.months);
        let months = u32::try_from(total_months.unsigned_abs()).ok()?;
        let shifted = if total_months >= 0 {
            instant.checked_add_months(chrono::Months::new(months))?
        } else {
            instant.checked_sub_months(chrono::Months::new(months))?
        };

        let seconds = self.days * 86_400.0
            + self.hours * 3_600.0
            + self.minutes * 60.0
            + self.seconds;
        if !seconds.is_finite() {
            return None;
        }
        let offset = chrono::Duration::milliseconds((seconds * 1_000.0).round() as i64);
        shifted.checked_add_signed(offset)
    }
}

/// Absolute field overrides applied strictly after a [`RelativeDelta`]
/// offset, e.g. pin `minute`/`second` to zero for "start of last full hour".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Replace {
    /// Override the year
    #[serde(default)]
    pub year: Option<i32>,
    /// Override the month (1-12)
    #[serde(default)]
    pub month: Option<u32>,
    /// Override the day of month (1-31)
    #[serde(default)]
    pub day: Option<u32>,
    /// Override the hour (0-23)
    #[serde(default)]
    pub hour: Option<u32>,
    /// Override the minute (0-59)
    #[serde(default)]
    pub minute: Option<u32>,
    /// Override the second (0-59)
    #[serde(default)]
    pub second: Option<u32>,
    /// Override the microsecond (0-999999)
    #[serde(default)]
    pub microsecond: Option<u32>,
}

impl Replace {
    /// Apply the overrides, preserving the instant's zone. Returns `None`
    /// when an override produces an invalid or non-existent local time.
    pub fn apply(&self, instant: DateTime<Tz>) -> Option<DateTime<Tz>> {
        let mut naive = instant.naive_local();
        if let Some(year) = self.year {
            naive = naive.with_year(year)?;
        }
        if let Some(month) = self.month {
            naive = naive.with_month(month)?;
        }
        if let Some(day) = self.day {
            naive = naive.with_day(day)?;
        }
        if let Some(hour) = self.hour {
            naive = naive.with_hour(hour)?;
        }
        if let Some(minute) = self.minute {
            naive = naive.with_minute(minute)?;
        }
        if let Some(second) = self.second {
            naive = naive.with_second(second)?;
        }
        if let Some(microsecond) = self.microsecond {
            naive = naive.with_nanosecond(microsecond.checked_mul(1_000)?)?;
        }
        instant.timezone().from_local_datetime(&naive).earliest()
    }
}

/// Parse a date/time string.
///
/// A bare zone abbreviation anywhere in the string is resolved through
/// `tzinfos`; strings without one are interpreted in `default_tz`. Returns
/// `None` when no accepted layout matches.
pub fn parse_datetime(
    input: &str,
    tzinfos: &HashMap<String, Tz>,
    default_tz: Tz,
) -> Option<DateTime<Tz>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut zone = default_tz;
    let mut tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if let Some(pos) = tokens.iter().position(|t| tzinfos.contains_key(*t)) {
        zone = tzinfos[tokens[pos]];
        tokens.remove(pos);
    }
    let cleaned = tokens.join(" ");

    for layout in DATETIME_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&cleaned, layout) {
            return zone.from_local_datetime(&naive).earliest();
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, layout) {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return zone.from_local_datetime(&naive).earliest();
        }
    }
    None
}

/// Format an instant with a strftime pattern, returning `None` instead of
/// panicking on an invalid pattern.
pub fn format_datetime(instant: &DateTime<Tz>, pattern: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", instant.format(pattern)).ok()?;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;
    use chrono_tz::UTC;

    fn eastern_tzinfos() -> HashMap<String, Tz> {
        let mut map = HashMap::new();
        map.insert("EDT".to_string(), New_York);
        map.insert("EST".to_string(), New_York);
        map
    }

    #[test]
    fn test_parse_iso_with_abbreviation() {
        let parsed = parse_datetime("2018-08-26 00:00:00 EDT", &eastern_tzinfos(), UTC).unwrap();
        assert_eq!(parsed.timezone(), New_York);
        assert_eq!(parsed.naive_local().to_string(), "2018-08-26 00:00:00");
    }

    #[test]
    fn test_parse_ctime_style() {
        let parsed =
            parse_datetime("Sun Aug 26 00:00:00 EDT 2018", &eastern_tzinfos(), UTC).unwrap();
        assert_eq!(parsed.naive_local().to_string(), "2018-08-26 00:00:00");
    }

    #[test]
    fn test_parse_without_abbreviation_uses_default_zone() {
        let parsed = parse_datetime("2020-01-02 03:04:05", &HashMap::new(), New_York).unwrap();
        assert_eq!(parsed.timezone(), New_York);
    }

    #[rstest::rstest]
    #[case("2018-Oct-30_11:09", "2018-10-30 11:09:00")]
    #[case("2020-01-02T03:04:05", "2020-01-02 03:04:05")]
    #[case("02-01-2020 03:04:05", "2020-01-02 03:04:05")]
    #[case("01/02/2020 03:04:05", "2020-01-02 03:04:05")]
    #[case("2020-01-02", "2020-01-02 00:00:00")]
    #[case("01/02/2020", "2020-01-02 00:00:00")]
    fn test_parse_accepted_layouts(#[case] input: &str, #[case] expected: &str) {
        let parsed = parse_datetime(input, &HashMap::new(), UTC).unwrap();
        assert_eq!(parsed.naive_local().to_string(), expected);
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert!(parse_datetime("not-a-date", &HashMap::new(), UTC).is_none());
        assert!(parse_datetime("", &HashMap::new(), UTC).is_none());
    }

    #[test]
    fn test_relativedelta_negative_hours_then_replace() {
        // "start of last full hour": hours=-1 then minute/second pinned to 0
        let now = UTC.with_ymd_and_hms(2024, 3, 10, 15, 42, 17).unwrap();
        let delta = RelativeDelta {
            hours: -1.0,
            ..Default::default()
        };
        let replace = Replace {
            minute: Some(0),
            second: Some(0),
            microsecond: Some(0),
            ..Default::default()
        };
        let result = replace.apply(delta.apply(now).unwrap()).unwrap();
        assert_eq!(result.naive_local().to_string(), "2024-03-10 14:00:00");
    }

    #[test]
    fn test_relativedelta_fractional_days_cascade() {
        let now = UTC.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let delta = RelativeDelta {
            days: 1.5,
            ..Default::default()
        };
        let result = delta.apply(now).unwrap();
        assert_eq!(result.naive_local().to_string(), "2024-01-02 12:00:00");
    }

    #[test]
    fn test_relativedelta_month_clamps_to_end_of_month() {
        let now = UTC.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        let delta = RelativeDelta {
            months: 1,
            ..Default::default()
        };
        let result = delta.apply(now).unwrap();
        assert_eq!(result.naive_local().date().to_string(), "2024-02-29");
    }

    #[test]
    fn test_relativedelta_negative_months() {
        let now = UTC.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let delta = RelativeDelta {
            years: -1,
            months: -2,
            ..Default::default()
        };
        let result = delta.apply(now).unwrap();
        assert_eq!(result.naive_local().date().to_string(), "2023-01-15");
    }

    #[test]
    fn test_replace_invalid_day_is_none() {
        let now = UTC.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap();
        let replace = Replace {
            day: Some(31),
            ..Default::default()
        };
        assert!(replace.apply(now).is_none());
    }

    #[test]
    fn test_format_datetime_plain_pattern() {
        let instant = New_York.with_ymd_and_hms(2018, 8, 26, 0, 0, 0).unwrap();
        assert_eq!(
            format_datetime(&instant, "%m-%d-%Y").unwrap(),
            "08-26-2018"
        );
    }
}
