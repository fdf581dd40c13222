//! Show project status command

use anyhow::{Context, Result};
use netharvest_core::Config;

/// Run the status command
pub async fn run(config_path: &str) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;

    println!("Project:  {}", config.project.name);
    println!("Version:  {}", config.project.version);
    println!("Base:     {}", config.base_path.display());

    let jobs = config.load_jobs().context("Failed to load jobs")?;
    println!("Jobs:     {}", jobs.len());

    let datasource_files = count_yaml_files(&config.base_path.join("datasources"));
    let transform_files = count_yaml_files(&config.base_path.join("transforms"));
    println!("Datasource files: {}", datasource_files);
    println!("Transform files:  {}", transform_files);

    Ok(())
}

fn count_yaml_files(directory: &std::path::Path) -> usize {
    std::fs::read_dir(directory)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| {
                    e.path()
                        .extension()
                        .is_some_and(|ext| ext == "yaml" || ext == "yml")
                })
                .count()
        })
        .unwrap_or(0)
}
