//! Validate configuration command

use anyhow::{Context, Result};
use netharvest_core::Config;

/// Run the validate command
pub async fn run(config_path: &str) -> Result<()> {
    tracing::info!("Validating configuration: {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;

    tracing::info!("Project: {}", config.project.name);
    tracing::info!("Version: {}", config.project.version);

    let engine_config = config
        .project
        .engine_config()
        .context("Invalid engine configuration")?;
    tracing::info!("Separator: {:?}", engine_config.separator_char());
    tracing::info!("Timezone: {}", engine_config.timezone);

    let jobs = config.load_jobs().context("Failed to load jobs")?;
    for job in &jobs {
        config
            .load_datasource_config(&job.datasource)
            .with_context(|| {
                format!(
                    "Job '{}': cannot resolve datasource '{}'",
                    job.name, job.datasource
                )
            })?;
        config
            .resolve_transform(job)
            .with_context(|| format!("Job '{}': cannot resolve transform", job.name))?;
        tracing::info!("Job '{}' is valid", job.name);
    }

    tracing::info!("Configuration is valid ({} jobs)", jobs.len());
    println!("Configuration is valid ({} jobs)", jobs.len());
    Ok(())
}
