//! Bulk query adapter
//!
//! POSTs an XML query document to the appliance's bulk data endpoint and
//! reparses the comma-separated response into pipeline lines. The header
//! row comes from the API response.

use netharvest_core::config::EngineConfig;
use netharvest_core::datasource::ApplianceConfig;
use netharvest_core::tabular;

use crate::error::{ConnectorError, Result};
use crate::http::build_client;

/// Run a bulk query and return separator-delimited lines, header first.
pub async fn fetch(
    appliance: &ApplianceConfig,
    query_document: &str,
    config: &EngineConfig,
) -> Result<Vec<String>> {
    let client = build_client(appliance.verify_tls)?;
    let url = format!(
        "{}/dbonequerydata/?username={}/password={}/encrypted=false/conversion=true/DT=csv",
        appliance.base_url(),
        appliance.username,
        appliance.password,
    );
    tracing::info!(host = %appliance.host, "submitting bulk query");

    let response = client
        .post(&url)
        .header("Content-Type", "text/xml;charset=UTF-8")
        .body(query_document.to_string())
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(ConnectorError::Status {
            status: response.status().as_u16(),
            url: format!("{}/dbonequerydata/", appliance.base_url()),
        });
    }

    let body = response.text().await?;
    reseparate(&body, config.separator)
}

/// Reparse a comma-separated payload and re-emit it with the pipeline
/// separator, header first.
pub fn reseparate(payload: &str, separator: u8) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .flexible(true)
        .from_reader(payload.as_bytes());

    let header: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }

    let blob = tabular::encode(&header, &rows, separator)?;
    Ok(blob.split("\r\n").map(|line| line.to_string()).collect())
}
