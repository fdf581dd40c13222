//! Netharvest Connectors Library
//!
//! Data-source adapters for the extraction pipeline. Every adapter
//! produces the same thing: separator-delimited lines ready for the
//! transformation engine. Adapters are I/O glue only; reshaping belongs
//! to the engine.
//!
//! - [`bulk`] - appliance bulk query API (XML in, CSV out)
//! - [`inventory`] - device/interface inventory XML API
//! - [`catalog`] - appliance Postgres service catalog
//! - [`pulse`] - Pulse KPI JSON API family
//! - [`window`] - relative query windows shared by the KPI adapters

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bulk;
pub mod catalog;
pub mod error;
pub mod http;
pub mod inventory;
pub mod pulse;
pub mod window;

use std::path::Path;

use netharvest_core::config::EngineConfig;
use netharvest_core::datasource::DatasourceConfig;
use netharvest_core::job::QueryConfig;

pub use error::{ConnectorError, Result};
pub use window::Window;

/// Execute a job's query against its datasource.
///
/// Relative `query_file`/`sql_file` paths resolve against `base_path`,
/// the project directory. Fails with [`ConnectorError::DatasourceMismatch`]
/// when the query and datasource kinds do not line up.
pub async fn fetch(
    query: &QueryConfig,
    datasource: &DatasourceConfig,
    reference: &str,
    config: &EngineConfig,
    base_path: &Path,
) -> Result<Vec<String>> {
    match (query, datasource) {
        (QueryConfig::Bulk(bulk_query), DatasourceConfig::Appliance(appliance)) => {
            let document = std::fs::read_to_string(base_path.join(&bulk_query.query_file))?;
            bulk::fetch(appliance, &document, config).await
        }
        (QueryConfig::Inventory(inventory_query), DatasourceConfig::Appliance(appliance)) => {
            inventory::fetch(appliance, inventory_query, config).await
        }
        (QueryConfig::Catalog(catalog_query), DatasourceConfig::Postgres(postgres)) => {
            catalog::fetch(postgres, &base_path.join(&catalog_query.sql_file), config).await
        }
        (QueryConfig::Pulse(pulse_query), DatasourceConfig::Pulse(pulse_config)) => {
            pulse::fetch(pulse_config, pulse_query, config).await
        }
        (QueryConfig::Bulk(_) | QueryConfig::Inventory(_), _) => {
            Err(ConnectorError::DatasourceMismatch {
                expected: "appliance",
                reference: reference.to_string(),
            })
        }
        (QueryConfig::Catalog(_), _) => Err(ConnectorError::DatasourceMismatch {
            expected: "postgres",
            reference: reference.to_string(),
        }),
        (QueryConfig::Pulse(_), _) => Err(ConnectorError::DatasourceMismatch {
            expected: "pulse",
            reference: reference.to_string(),
        }),
    }
}
