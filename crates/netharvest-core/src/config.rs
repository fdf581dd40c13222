//! Configuration parsing and validation
//!
//! This module handles loading and validating netharvest configuration
//! files.
//!
//! # Configuration Files
//!
//! - `netharvest.yaml` - Project root configuration (separator, timezone,
//!   abbreviation table)
//! - `jobs/*.yaml` - Extraction job definitions
//! - `datasources/*.yaml` - Appliance endpoints and credentials, resolved
//!   by dotted reference (`"ngone.primary"` → `datasources/ngone.yaml`,
//!   key `primary`)
//! - `transforms/*.yaml` - Transform specs referenced by jobs

use std::collections::HashMap;
use std::path::Path;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::datasource::DatasourceConfig;
use crate::error::{Error, Result};
use crate::job::{Job, TransformRef};
use crate::transforms::TransformSpec;

/// Root project configuration from `netharvest.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// Field separator used throughout the pipeline (single ASCII character)
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Default timezone for "now" calculations (IANA name)
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Zone abbreviation → IANA name, for disambiguating textual dates
    #[serde(default)]
    pub tzinfos: HashMap<String, String>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_separator() -> String {
    "\t".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl ProjectConfig {
    /// Build the immutable engine configuration from the project settings.
    /// Validates the separator and every timezone name.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let bytes = self.separator.as_bytes();
        if bytes.len() != 1 || !bytes[0].is_ascii() {
            return Err(Error::ConfigInvalid {
                message: format!(
                    "separator must be a single ASCII character, got {:?}",
                    self.separator
                ),
            });
        }
        let timezone: Tz = self.timezone.parse().map_err(|_| Error::ConfigInvalid {
            message: format!("unknown timezone '{}'", self.timezone),
        })?;
        let mut tzinfos = HashMap::new();
        for (abbreviation, zone_name) in &self.tzinfos {
            let zone: Tz = zone_name.parse().map_err(|_| Error::ConfigInvalid {
                message: format!(
                    "unknown timezone '{}' for abbreviation '{}'",
                    zone_name, abbreviation
                ),
            })?;
            tzinfos.insert(abbreviation.clone(), zone);
        }
        Ok(EngineConfig {
            separator: bytes[0],
            timezone,
            tzinfos,
        })
    }
}

/// Immutable engine configuration, constructed once at process start and
/// passed by reference into the engine and resolvers.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Field separator byte
    pub separator: u8,

    /// Default timezone for all "now" calculations
    pub timezone: Tz,

    /// Zone abbreviation → timezone, used only to disambiguate textual
    /// date strings carrying a bare abbreviation
    pub tzinfos: HashMap<String, Tz>,
}

impl EngineConfig {
    /// The separator as a char, for line splitting and joining.
    pub fn separator_char(&self) -> char {
        self.separator as char
    }
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project
    pub base_path: std::path::PathBuf,
}

impl Config {
    /// Load configuration from a directory
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the project directory or netharvest.yaml file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join("netharvest.yaml"), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = serde_yaml::from_str(&contents)?;

        Ok(Self { project, base_path })
    }

    /// Load all job definitions from `jobs/*.yaml`
    pub fn load_jobs(&self) -> Result<Vec<Job>> {
        let jobs_dir = self.base_path.join("jobs");
        if !jobs_dir.exists() {
            return Ok(vec![]);
        }

        let mut entries: Vec<_> = std::fs::read_dir(&jobs_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
            })
            .collect();
        entries.sort_by_key(|e| e.path());

        let mut jobs = Vec::new();
        for entry in entries {
            let contents = std::fs::read_to_string(entry.path())?;
            let job: Job = serde_yaml::from_str(&contents)?;
            jobs.push(job);
        }
        Ok(jobs)
    }

    /// Resolve a dotted datasource reference like `"ngone.primary"` to a
    /// `DatasourceConfig`.
    ///
    /// The reference format is `"<filename>.<key>"` which maps to
    /// `datasources/<filename>.yaml` → key `<key>`.
    pub fn load_datasource_config(&self, reference: &str) -> Result<DatasourceConfig> {
        let (file, key) = reference
            .split_once('.')
            .ok_or_else(|| Error::ConfigInvalid {
                message: format!(
                    "datasource reference '{}' must be in 'file.key' format",
                    reference
                ),
            })?;

        let path = self
            .base_path
            .join("datasources")
            .join(format!("{}.yaml", file));
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&path)?;
        let doc: serde_yaml::Value = serde_yaml::from_str(&contents)?;

        let datasource_value = doc.get(key).ok_or_else(|| Error::ConfigInvalid {
            message: format!("key '{}' not found in {}", key, path.display()),
        })?;

        let config: DatasourceConfig = serde_yaml::from_value(datasource_value.clone())?;
        Ok(config)
    }

    /// Resolve a job's transform spec: inline specs are returned as-is,
    /// file references are loaded from `transforms/<file>`.
    pub fn resolve_transform(&self, job: &Job) -> Result<Option<TransformSpec>> {
        match &job.transform {
            None => Ok(None),
            Some(TransformRef::Inline(spec)) => Ok(Some(spec.clone())),
            Some(TransformRef::File { file }) => {
                let path = self.base_path.join("transforms").join(file);
                if !path.exists() {
                    return Err(Error::ConfigNotFound {
                        path: path.display().to_string(),
                    });
                }
                let contents = std::fs::read_to_string(&path)?;
                let spec: TransformSpec = serde_yaml::from_str(&contents)?;
                Ok(Some(spec))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
name: test-project
"#;
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "test-project");
        assert_eq!(config.version, "0.1.0");
        assert_eq!(config.separator, "\t");
        assert_eq!(config.timezone, "UTC");
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
name: test-project
version: "1.0.0"
separator: "|"
timezone: America/New_York
tzinfos:
  EDT: America/New_York
  EST: America/New_York
"#;
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.separator, "|");
        let engine = config.engine_config().unwrap();
        assert_eq!(engine.separator, b'|');
        assert_eq!(engine.timezone, chrono_tz::America::New_York);
        assert_eq!(
            engine.tzinfos.get("EDT"),
            Some(&chrono_tz::America::New_York)
        );
    }

    #[test]
    fn test_multibyte_separator_rejected() {
        let yaml = "name: t\nseparator: \"||\"\n";
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.engine_config().is_err());
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let yaml = "name: t\ntimezone: Mars/Olympus_Mons\n";
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.engine_config().is_err());
    }
}
