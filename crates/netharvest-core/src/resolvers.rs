//! Column resolvers
//!
//! A resolver computes one output column's value for one row. Data-quality
//! problems (lookup miss, unparseable date) degrade to the configured
//! default or the date sentinel so a batch never aborts over one bad row;
//! only configuration problems are surfaced as errors, and those are
//! raised by the engine before a resolver runs.

use std::collections::HashMap;
use std::path::Path;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::config::EngineConfig;
use crate::datetime::{format_datetime, parse_datetime};
use crate::error::Result;
use crate::transforms::{DateInjectionResolver, DateResolver, SimpleResolver};

/// Fixed fallback emitted on any date-parsing failure.
pub const DATE_SENTINEL: &str = "00-0-0000 00:00:00";

/// An external lookup table, loaded fully into memory as field-name-keyed
/// records. Treated as immutable for the duration of an engine invocation.
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    records: Vec<HashMap<String, String>>,
}

impl LookupTable {
    /// Load a delimited lookup table with a header row.
    pub fn load(path: &Path, separator: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(separator)
            .flexible(true)
            .from_path(path)?;
        let headers = reader.headers()?.clone();
        let mut records = Vec::new();
        for record in reader.records() {
            let record = record?;
            records.push(
                headers
                    .iter()
                    .zip(record.iter())
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
            );
        }
        Ok(Self { records })
    }

    /// Build a table directly from records. Test helper and escape hatch
    /// for callers that pre-load shared tables.
    pub fn from_records(records: Vec<HashMap<String, String>>) -> Self {
        Self { records }
    }
}

/// Resolve a `simple` lookup column.
///
/// A record matches when its `lookup_column` value appears anywhere among
/// the row's fields - a membership test, not a positional equality join.
/// Historically the lookup key's column may not align positionally with
/// the output row after earlier transformations, so this is the documented
/// contract, not an accident to fix here. First match wins; a miss, a
/// missing table, or a record without the requested columns returns the
/// configured default.
pub fn resolve_simple(
    row: &[String],
    output_column: &str,
    config: &SimpleResolver,
    table: Option<&LookupTable>,
) -> String {
    let Some(table) = table else {
        return config.default.clone();
    };
    for record in &table.records {
        let Some(key) = record.get(&config.lookup_column) else {
            return config.default.clone();
        };
        if row.iter().any(|field| field == key) {
            return record
                .get(output_column)
                .cloned()
                .unwrap_or_else(|| config.default.clone());
        }
    }
    config.default.clone()
}

/// Resolve a `date` column: parse the source field and reformat it.
/// Returns [`DATE_SENTINEL`] on any failure.
pub fn resolve_date(
    row: &[String],
    input_header: &[String],
    config: &DateResolver,
    engine: &EngineConfig,
) -> String {
    let value = input_header
        .iter()
        .position(|name| name == &config.lookup_column)
        .and_then(|index| row.get(index));
    let Some(value) = value else {
        return DATE_SENTINEL.to_string();
    };
    parse_datetime(value, &engine.tzinfos, engine.timezone)
        .and_then(|parsed| format_datetime(&parsed, &config.date_format))
        .unwrap_or_else(|| DATE_SENTINEL.to_string())
}

/// Resolve a `date_injection` column from the invocation-captured "now".
///
/// Row content is ignored, so every row of an invocation receives the same
/// value. Failures emit a diagnostic trace and the sentinel.
pub fn resolve_date_injection(now: DateTime<Tz>, config: &DateInjectionResolver) -> String {
    let formatted = config
        .relativedelta
        .apply(now)
        .and_then(|shifted| config.replace.apply(shifted))
        .and_then(|adjusted| format_datetime(&adjusted, &config.date_format));
    match formatted {
        Some(value) => value,
        None => {
            tracing::error!(
                date_format = %config.date_format,
                "date injection failed, emitting sentinel"
            );
            DATE_SENTINEL.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;
    use chrono_tz::America::New_York;
    use chrono_tz::UTC;

    fn strings(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    fn record(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn simple_config(default: &str) -> SimpleResolver {
        SimpleResolver {
            mapping_file: "unused.csv".into(),
            lookup_column: "service".to_string(),
            default: default.to_string(),
        }
    }

    fn engine_config() -> EngineConfig {
        let mut tzinfos = HashMap::new();
        tzinfos.insert("EDT".to_string(), New_York);
        tzinfos.insert("EST".to_string(), New_York);
        EngineConfig {
            separator: b'\t',
            timezone: New_York,
            tzinfos,
        }
    }

    #[test]
    fn simple_lookup_matches_value_in_any_column() {
        // Membership semantics: the key matches even though "O365 Exchange"
        // is not in the column positionally named by lookup_column.
        let table = LookupTable::from_records(vec![record(&[
            ("service", "O365 Exchange"),
            ("customer", "Contoso"),
        ])]);
        let row = strings(&["122030298", "O365 Exchange", "0.0"]);
        let value = resolve_simple(&row, "customer", &simple_config("N/A"), Some(&table));
        assert_eq!(value, "Contoso");
    }

    #[test]
    fn simple_lookup_first_match_wins() {
        let table = LookupTable::from_records(vec![
            record(&[("service", "svc-a"), ("customer", "First")]),
            record(&[("service", "svc-a"), ("customer", "Second")]),
        ]);
        let row = strings(&["svc-a"]);
        let value = resolve_simple(&row, "customer", &simple_config("N/A"), Some(&table));
        assert_eq!(value, "First");
    }

    #[test]
    fn simple_lookup_miss_returns_default() {
        let table = LookupTable::from_records(vec![record(&[
            ("service", "svc-a"),
            ("customer", "Contoso"),
        ])]);
        let row = strings(&["svc-b", "1234"]);
        let value = resolve_simple(&row, "customer", &simple_config("N/A"), Some(&table));
        assert_eq!(value, "N/A");
    }

    #[test]
    fn simple_lookup_missing_table_returns_default() {
        let row = strings(&["svc-a"]);
        let value = resolve_simple(&row, "customer", &simple_config("N/A"), None);
        assert_eq!(value, "N/A");
    }

    #[test]
    fn simple_lookup_missing_output_column_returns_default() {
        let table = LookupTable::from_records(vec![record(&[("service", "svc-a")])]);
        let row = strings(&["svc-a"]);
        let value = resolve_simple(&row, "customer", &simple_config("N/A"), Some(&table));
        assert_eq!(value, "N/A");
    }

    #[test]
    fn date_resolver_reformats_with_abbreviation() {
        let config = DateResolver {
            lookup_column: "targetTime_String".to_string(),
            date_format: "%m-%d-%Y".to_string(),
        };
        let header = strings(&["serviceId", "targetTime_String"]);
        let row = strings(&["122029775", "2018-08-26 00:00:00 EDT"]);
        assert_eq!(resolve_date(&row, &header, &config, &engine_config()), "08-26-2018");
    }

    #[test]
    fn date_resolver_sentinel_on_garbage() {
        let config = DateResolver {
            lookup_column: "targetTime_String".to_string(),
            date_format: "%m-%d-%Y".to_string(),
        };
        let header = strings(&["targetTime_String"]);
        let row = strings(&["not-a-date"]);
        assert_eq!(
            resolve_date(&row, &header, &config, &engine_config()),
            DATE_SENTINEL
        );
    }

    #[test]
    fn date_resolver_sentinel_on_missing_column() {
        let config = DateResolver {
            lookup_column: "absent".to_string(),
            date_format: "%m-%d-%Y".to_string(),
        };
        let header = strings(&["other"]);
        let row = strings(&["2018-08-26 00:00:00"]);
        assert_eq!(
            resolve_date(&row, &header, &config, &engine_config()),
            DATE_SENTINEL
        );
    }

    #[test]
    fn date_injection_offsets_and_replaces() {
        let now = UTC.with_ymd_and_hms(2024, 5, 6, 10, 30, 45).unwrap();
        let config = DateInjectionResolver {
            relativedelta: crate::datetime::RelativeDelta {
                hours: -1.0,
                ..Default::default()
            },
            replace: crate::datetime::Replace {
                minute: Some(0),
                second: Some(0),
                ..Default::default()
            },
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
        };
        assert_eq!(resolve_date_injection(now, &config), "2024-05-06 09:00:00");
    }

    #[test]
    fn date_injection_sentinel_on_invalid_replace() {
        let now = UTC.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let config = DateInjectionResolver {
            relativedelta: Default::default(),
            replace: crate::datetime::Replace {
                month: Some(13),
                ..Default::default()
            },
            date_format: "%Y-%m-%d".to_string(),
        };
        assert_eq!(resolve_date_injection(now, &config), DATE_SENTINEL);
    }
}
