//! Relative query windows
//!
//! Pulse KPI queries are bounded by a [start, end) window computed from
//! "now": a signed calendar offset followed by absolute field overrides
//! for each bound. "Last full hour" is `start: hours=-1, minute=0,
//! second=0` with `end: minute=0, second=0`.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use netharvest_core::config::EngineConfig;
use netharvest_core::job::WindowSpec;

use crate::error::{ConnectorError, Result};

/// Row datestamp layout carried into every KPI row.
const DATESTAMP_LAYOUT: &str = "%d-%m-%Y %H:%M:%S";

/// A computed query window.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    /// Window start
    pub start: DateTime<Tz>,
    /// Window end
    pub end: DateTime<Tz>,
}

impl Window {
    /// Compute the window against the current time in the configured zone.
    pub fn compute(spec: &WindowSpec, config: &EngineConfig) -> Result<Self> {
        let now = Utc::now().with_timezone(&config.timezone);
        Self::compute_at(now, spec)
    }

    /// Compute the window against an explicit reference instant.
    pub fn compute_at(now: DateTime<Tz>, spec: &WindowSpec) -> Result<Self> {
        let start = spec
            .start_relativedelta
            .apply(now)
            .and_then(|shifted| spec.start_replace.apply(shifted))
            .ok_or_else(|| ConnectorError::Window {
                message: "start bound does not resolve to a valid instant".to_string(),
            })?;
        let end = spec
            .end_relativedelta
            .apply(now)
            .and_then(|shifted| spec.end_replace.apply(shifted))
            .ok_or_else(|| ConnectorError::Window {
                message: "end bound does not resolve to a valid instant".to_string(),
            })?;
        Ok(Self { start, end })
    }

    /// Window start as epoch seconds.
    pub fn start_epoch(&self) -> i64 {
        self.start.timestamp()
    }

    /// Window end as epoch seconds.
    pub fn end_epoch(&self) -> i64 {
        self.end.timestamp()
    }

    /// The window-start stamp written into every row.
    pub fn datestamp(&self) -> String {
        self.start.format(DATESTAMP_LAYOUT).to_string()
    }

    /// The window-end stamp, logged for traceability.
    pub fn end_datestamp(&self) -> String {
        self.end.format(DATESTAMP_LAYOUT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;
    use chrono_tz::UTC;
    use netharvest_core::datetime::{RelativeDelta, Replace};

    #[test]
    fn test_last_full_hour_window() {
        let now = UTC.with_ymd_and_hms(2024, 3, 10, 15, 42, 17).unwrap();
        let spec = WindowSpec {
            start_relativedelta: RelativeDelta {
                hours: -1.0,
                ..Default::default()
            },
            start_replace: Replace {
                minute: Some(0),
                second: Some(0),
                ..Default::default()
            },
            end_relativedelta: RelativeDelta::default(),
            end_replace: Replace {
                minute: Some(0),
                second: Some(0),
                ..Default::default()
            },
        };
        let window = Window::compute_at(now, &spec).unwrap();
        assert_eq!(window.datestamp(), "10-03-2024 14:00:00");
        assert_eq!(window.end_datestamp(), "10-03-2024 15:00:00");
        assert_eq!(window.end_epoch() - window.start_epoch(), 3600);
    }

    #[test]
    fn test_empty_spec_is_now_to_now() {
        let now = UTC.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap();
        let window = Window::compute_at(now, &WindowSpec::default()).unwrap();
        assert_eq!(window.start_epoch(), window.end_epoch());
    }

    #[test]
    fn test_invalid_replace_is_error() {
        let now = UTC.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap();
        let spec = WindowSpec {
            start_replace: Replace {
                day: Some(31),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(Window::compute_at(now, &spec).is_err());
    }
}
