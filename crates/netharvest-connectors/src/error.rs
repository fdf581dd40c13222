//! Adapter error types

use thiserror::Error;

/// Errors raised while fetching from a datasource.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("unexpected status {status} from {url}")]
    Status {
        /// Response status code
        status: u16,
        /// Request URL
        url: String,
    },

    /// XML decode failure (inventory API)
    #[error("XML decode error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// JSON decode failure (Pulse API)
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database failure (service catalog)
    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),

    /// CSV reparse failure (bulk query API)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem failure (query/SQL files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Job points a query at the wrong kind of datasource
    #[error("query requires a {expected} datasource, reference '{reference}' is not one")]
    DatasourceMismatch {
        /// Datasource kind the query needs
        expected: &'static str,
        /// The offending dotted reference
        reference: String,
    },

    /// API response is missing a field the adapter requires
    #[error("response missing field '{field}'")]
    MissingField {
        /// Field name
        field: String,
    },

    /// Pulse login did not yield a token
    #[error("authentication failed: {message}")]
    Auth {
        /// Server-side detail
        message: String,
    },

    /// Query window could not be computed
    #[error("invalid query window: {message}")]
    Window {
        /// What went wrong
        message: String,
    },

    /// No running Pulse test type matches the requested kind
    #[error("no running test type '{type_name}' in group '{group}'")]
    TestTypeNotFound {
        /// Business group
        group: String,
        /// Service type name
        type_name: String,
    },

    /// Engine-level failure while reshaping adapter output
    #[error(transparent)]
    Core(#[from] netharvest_core::Error),
}

/// Result alias for connector operations.
pub type Result<T> = std::result::Result<T, ConnectorError>;
