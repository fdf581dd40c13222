//! Transformation specification
//!
//! A transform spec is a declarative YAML document describing how a raw
//! result set is reshaped into the report schema. Two independent optional
//! sections:
//!
//! - `Header` - prepend a literal header (`add_header`) and/or rename
//!   existing columns in place (`modify_header`)
//! - `Transformations` - per output column, how to synthesize a value when
//!   the column is not already present in the input
//!
//! # Example
//!
//! ```yaml
//! Header:
//!   modify_header:
//!     serviceId_String: service
//!
//! Transformations:
//!   customer:
//!     type: simple
//!     mapping_file: mappings/service_mappings.csv
//!     lookup_column: service
//!     default: "N/A"
//!   date:
//!     type: date
//!     lookup_column: targetTime_String
//!     date_format: "%m-%d-%Y"
//!   reported_at:
//!     type: date_injection
//!     relativedelta:
//!       hours: -1
//!     replace:
//!       minute: 0
//!       second: 0
//!     date_format: "%d-%m-%Y %H:%M:%S"
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::datetime::{RelativeDelta, Replace};

/// A parsed transformation specification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformSpec {
    /// Header adjustments, applied before any row resolution
    #[serde(rename = "Header", default, skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderSpec>,

    /// Output column name → resolver configuration
    #[serde(
        rename = "Transformations",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub transformations: Option<HashMap<String, ResolverConfig>>,
}

/// Header section of a transform spec.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderSpec {
    /// Literal header prepended when the adapter output has no header row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_header: Option<Vec<String>>,

    /// Positional renames: existing name → new name. Every key must exist
    /// in the current header or resolution fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modify_header: Option<HashMap<String, String>>,
}

/// Resolver configuration, dispatched on the `type` discriminator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolverConfig {
    /// Value substitution through an external delimited lookup table
    Simple(SimpleResolver),

    /// Parse-and-reformat of an existing date/time field
    Date(DateResolver),

    /// Value synthesized from "now" plus a relative offset, row-independent
    DateInjection(DateInjectionResolver),
}

/// Configuration for a `simple` lookup resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleResolver {
    /// Path to the delimited lookup table (same separator as the pipeline)
    pub mapping_file: PathBuf,

    /// Column of the lookup table whose value is matched against the row
    pub lookup_column: String,

    /// Value returned on a lookup miss or any table problem
    pub default: String,
}

/// Configuration for a `date` reformat resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateResolver {
    /// Input column holding the date/time string
    pub lookup_column: String,

    /// strftime output pattern
    pub date_format: String,
}

/// Configuration for a `date_injection` resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateInjectionResolver {
    /// Signed calendar offset applied to the captured "now"
    #[serde(default)]
    pub relativedelta: RelativeDelta,

    /// Absolute field overrides applied after the offset
    #[serde(default)]
    pub replace: Replace,

    /// strftime output pattern
    pub date_format: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_resolver() {
        let yaml = r#"
type: simple
mapping_file: mappings/service_mappings.csv
lookup_column: service
default: "N/A"
"#;
        let config: ResolverConfig = serde_yaml::from_str(yaml).unwrap();
        match config {
            ResolverConfig::Simple(simple) => {
                assert_eq!(simple.lookup_column, "service");
                assert_eq!(simple.default, "N/A");
            }
            _ => panic!("Expected simple resolver"),
        }
    }

    #[test]
    fn test_parse_date_resolver() {
        let yaml = r#"
type: date
lookup_column: targetTime_String
date_format: "%m-%d-%Y"
"#;
        let config: ResolverConfig = serde_yaml::from_str(yaml).unwrap();
        match config {
            ResolverConfig::Date(date) => {
                assert_eq!(date.lookup_column, "targetTime_String");
                assert_eq!(date.date_format, "%m-%d-%Y");
            }
            _ => panic!("Expected date resolver"),
        }
    }

    #[test]
    fn test_parse_date_injection_resolver() {
        let yaml = r#"
type: date_injection
relativedelta:
  hours: -1
replace:
  minute: 0
  second: 0
date_format: "%d-%m-%Y %H:%M:%S"
"#;
        let config: ResolverConfig = serde_yaml::from_str(yaml).unwrap();
        match config {
            ResolverConfig::DateInjection(injection) => {
                assert_eq!(injection.relativedelta.hours, -1.0);
                assert_eq!(injection.replace.minute, Some(0));
                assert_eq!(injection.date_format, "%d-%m-%Y %H:%M:%S");
            }
            _ => panic!("Expected date_injection resolver"),
        }
    }

    #[test]
    fn test_parse_date_injection_defaults() {
        let yaml = r#"
type: date_injection
date_format: "%Y-%m-%d"
"#;
        let config: ResolverConfig = serde_yaml::from_str(yaml).unwrap();
        match config {
            ResolverConfig::DateInjection(injection) => {
                assert_eq!(injection.relativedelta.hours, 0.0);
                assert!(injection.replace.minute.is_none());
            }
            _ => panic!("Expected date_injection resolver"),
        }
    }

    #[test]
    fn test_parse_full_spec() {
        let yaml = r#"
Header:
  add_header:
    - serviceId
    - serviceName
  modify_header:
    serviceName: service
Transformations:
  customer:
    type: simple
    mapping_file: mappings/customers.csv
    lookup_column: service
    default: Unknown
"#;
        let spec: TransformSpec = serde_yaml::from_str(yaml).unwrap();
        let header = spec.header.unwrap();
        assert_eq!(header.add_header.unwrap().len(), 2);
        assert_eq!(
            header.modify_header.unwrap().get("serviceName"),
            Some(&"service".to_string())
        );
        assert!(spec.transformations.unwrap().contains_key("customer"));
    }

    #[test]
    fn test_parse_empty_spec() {
        let spec: TransformSpec = serde_yaml::from_str("{}").unwrap();
        assert!(spec.header.is_none());
        assert!(spec.transformations.is_none());
    }

    #[test]
    fn test_unknown_type_fails() {
        let yaml = "type: regex\npattern: abc\n";
        let result: Result<ResolverConfig, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }
}
