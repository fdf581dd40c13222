//! Shared HTTP client construction

use std::time::Duration;

use crate::error::Result;

/// HTTP request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client used by the appliance and Pulse adapters.
///
/// Appliances typically run with self-signed certificates, so certificate
/// verification is opt-in via the datasource's `verify_tls` flag.
pub fn build_client(verify_tls: bool) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .danger_accept_invalid_certs(!verify_tls)
        .build()?;
    Ok(client)
}
