//! Extraction job definition
//!
//! A job ties together one datasource, one adapter query, the report's
//! output header, an optional transform spec and zero or more deliveries.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::datetime::{RelativeDelta, Replace};
use crate::transforms::TransformSpec;

/// An extraction job definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Job name (must be unique within project)
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Datasource reference in `file.key` form
    pub datasource: String,

    /// What to fetch from the datasource
    pub query: QueryConfig,

    /// Column names of the finished report, in order
    pub output_header: Vec<String>,

    /// Transform spec, inline or a file reference; absent = pass-through
    #[serde(default)]
    pub transform: Option<TransformRef>,

    /// Where the finished report goes
    #[serde(default)]
    pub deliveries: Vec<DeliveryConfig>,
}

impl Job {
    /// Get the job name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Transform reference: a separate YAML file or an inline spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransformRef {
    /// File under `transforms/`
    File {
        /// File name relative to the `transforms/` directory
        file: String,
    },

    /// Spec written directly in the job file
    Inline(TransformSpec),
}

/// Adapter query, dispatched on the `type` discriminator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryConfig {
    /// Bulk CSV query API: an XML query document POSTed to the appliance
    Bulk(BulkQuery),

    /// Device/interface inventory XML API
    Inventory(InventoryQuery),

    /// SQL against the appliance service catalog
    Catalog(CatalogQuery),

    /// Pulse KPI JSON API
    Pulse(PulseQuery),
}

/// Bulk query configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkQuery {
    /// Path to the XML query document, relative to the project base
    pub query_file: PathBuf,
}

/// Inventory query configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryQuery {
    /// Device attributes emitted, in order
    pub device_fields: Vec<String>,

    /// Interface attributes appended after the device attributes, in order
    #[serde(default)]
    pub interface_fields: Vec<String>,
}

/// Catalog query configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogQuery {
    /// Path to the SQL file, relative to the project base
    pub sql_file: PathBuf,
}

/// Pulse query configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseQuery {
    /// Business group the tests belong to
    pub group: String,

    /// Service kind, selects the KPI set and row shape
    pub kind: PulseKind,

    /// Test names to include; empty means every running test
    #[serde(default)]
    pub tests: Vec<String>,

    /// Device names to include per device type, for the infrastructure
    /// kind; an absent or empty list means every device of that type
    #[serde(default)]
    pub devices: HashMap<String, Vec<String>>,

    /// Emit per-timestamp trend points instead of window aggregates
    #[serde(default)]
    pub trends: bool,

    /// Query window relative to "now"
    #[serde(default)]
    pub window: WindowSpec,
}

/// Pulse service kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PulseKind {
    /// Per-device-type status color counts
    Infrastructure,
    /// Availability plus caller/callee MOS
    Voip,
    /// Average/best/worst latency
    Latency,
    /// Ping availability and response
    Ping,
    /// Web page response
    Web,
    /// O365 OneDrive max upload time
    O365Onedrive,
    /// O365 Outlook max response time
    O365Outlook,
}

/// Relative query window: `start` and `end` are computed from "now".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Offset from now to the window start
    #[serde(default)]
    pub start_relativedelta: RelativeDelta,

    /// Overrides applied to the window start after the offset
    #[serde(default)]
    pub start_replace: Replace,

    /// Offset from now to the window end
    #[serde(default)]
    pub end_relativedelta: RelativeDelta,

    /// Overrides applied to the window end after the offset
    #[serde(default)]
    pub end_replace: Replace,
}

/// Delivery target, dispatched on the `type` discriminator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeliveryConfig {
    /// Write the report to the filesystem
    Disk(DiskDelivery),

    /// Mail the report as an attachment
    Email(EmailDelivery),
}

/// Disk delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskDelivery {
    /// Target directory, created if absent
    pub directory: PathBuf,

    /// File name; strftime patterns are expanded against the run time
    pub filename: String,
}

/// Email delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailDelivery {
    /// SMTP datasource reference in `file.key` form
    pub datasource: String,

    /// Message recipients; each gets an individual message
    pub recipients: Vec<String>,

    /// Message subject
    pub subject: String,

    /// Plain-text body
    #[serde(default)]
    pub body: String,

    /// Attachment file name; strftime patterns are expanded
    pub filename: String,
}
