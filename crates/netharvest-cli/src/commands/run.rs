//! Run extraction jobs command

use anyhow::{Context, Result};
use netharvest_core::Config;
use netharvest_runtime::Runtime;

/// Run the run command
pub async fn run(config_path: &str, job: Option<&str>) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    let runtime = Runtime::new(config)?;

    match job {
        Some(name) => runtime.run_job_by_name(name).await,
        None => runtime.run_all().await,
    }
}
