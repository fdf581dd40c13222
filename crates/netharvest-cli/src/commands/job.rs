//! Job management commands

use anyhow::{Context, Result};
use netharvest_core::Config;

/// List all jobs
pub async fn list(config_path: &str) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    let jobs = config.load_jobs().context("Failed to load jobs")?;

    if jobs.is_empty() {
        println!("No jobs configured");
        return Ok(());
    }
    for job in &jobs {
        match &job.description {
            Some(description) => println!("{}  -  {}", job.name, description),
            None => println!("{}", job.name),
        }
    }
    Ok(())
}

/// Show job details
pub async fn show(config_path: &str, name: &str) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    let jobs = config.load_jobs().context("Failed to load jobs")?;
    let job = jobs
        .iter()
        .find(|job| job.name == name)
        .with_context(|| format!("No job named '{}'", name))?;

    print!("{}", serde_yaml::to_string(job)?);
    Ok(())
}
