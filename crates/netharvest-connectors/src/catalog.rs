//! Service catalog adapter
//!
//! Runs a SQL file against the appliance's Postgres schema and renders
//! every column of every row to text. The output has no header line;
//! catalog jobs supply one through `add_header`.

use std::path::Path;

use sqlx::postgres::PgRow;
use sqlx::{Column as _, Connection as _, PgConnection, Row as _};

use netharvest_core::config::EngineConfig;
use netharvest_core::datasource::PostgresConfig;

use crate::error::Result;

/// Run the query and return separator-delimited lines, one per row.
pub async fn fetch(
    postgres: &PostgresConfig,
    sql_file: &Path,
    config: &EngineConfig,
) -> Result<Vec<String>> {
    let sql = std::fs::read_to_string(sql_file)?;
    tracing::info!(
        host = %postgres.host,
        database = %postgres.database,
        sql_file = %sql_file.display(),
        "running catalog query"
    );

    let mut connection = PgConnection::connect(&postgres.connection_url()).await?;
    let rows = sqlx::query(&sql).fetch_all(&mut connection).await?;
    connection.close().await?;

    let separator = config.separator_char().to_string();
    Ok(rows
        .iter()
        .map(|row| {
            (0..row.columns().len())
                .map(|index| render_column(row, index))
                .collect::<Vec<_>>()
                .join(&separator)
        })
        .collect())
}

/// Render one column to text. The catalog mixes text, integer, float and
/// boolean columns; NULL renders empty.
fn render_column(row: &PgRow, index: usize) -> String {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value.unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map(|v| v.to_string()).unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<i32>, _>(index) {
        return value.map(|v| v.to_string()).unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return value.map(|v| v.to_string()).unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return value.map(|v| v.to_string()).unwrap_or_default();
    }
    tracing::warn!(
        column = row.columns()[index].name(),
        "unrenderable column type, emitting empty field"
    );
    String::new()
}
