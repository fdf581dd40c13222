//! Extraction job orchestration

use anyhow::{bail, Context as _};
use chrono::Utc;

use netharvest_core::config::EngineConfig;
use netharvest_core::datasource::DatasourceConfig;
use netharvest_core::engine;
use netharvest_core::job::{DeliveryConfig, Job};
use netharvest_core::Config;

use crate::delivery;
use crate::error::Result;

/// Runtime engine for executing extraction jobs
pub struct Runtime {
    config: Config,
    engine_config: EngineConfig,
}

impl Runtime {
    /// Create a new runtime from a loaded project configuration
    pub fn new(config: Config) -> Result<Self> {
        let engine_config = config
            .project
            .engine_config()
            .context("invalid project configuration")?;
        Ok(Self {
            config,
            engine_config,
        })
    }

    /// The project configuration this runtime runs against.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every configured job in order. A failing job aborts that job
    /// only; the run fails once all jobs have been attempted.
    pub async fn run_all(&self) -> Result<()> {
        let jobs = self.config.load_jobs().context("loading jobs")?;
        tracing::info!(jobs = jobs.len(), "starting extraction run");

        let mut failures = 0;
        for job in &jobs {
            if let Err(error) = self.run_job(job).await {
                tracing::error!(job = %job.name, error = %format!("{error:#}"), "job failed");
                failures += 1;
            }
        }
        if failures > 0 {
            bail!("{failures} of {} jobs failed", jobs.len());
        }
        Ok(())
    }

    /// Run one job by name.
    pub async fn run_job_by_name(&self, name: &str) -> Result<()> {
        let jobs = self.config.load_jobs().context("loading jobs")?;
        let job = jobs
            .iter()
            .find(|job| job.name == name)
            .with_context(|| format!("no job named '{}'", name))?;
        self.run_job(job).await
    }

    /// Execute one job: fetch, transform, deliver.
    pub async fn run_job(&self, job: &Job) -> Result<()> {
        tracing::info!(job = %job.name, datasource = %job.datasource, "running job");

        let datasource = self
            .config
            .load_datasource_config(&job.datasource)
            .with_context(|| format!("resolving datasource '{}'", job.datasource))?;

        let lines = netharvest_connectors::fetch(
            &job.query,
            &datasource,
            &job.datasource,
            &self.engine_config,
            &self.config.base_path,
        )
        .await
        .with_context(|| format!("fetching data for job '{}'", job.name))?;
        tracing::debug!(job = %job.name, lines = lines.len(), "fetch complete");

        let spec = self
            .config
            .resolve_transform(job)
            .with_context(|| format!("resolving transform for job '{}'", job.name))?
            .unwrap_or_default();
        let report = engine::transform(&lines, &job.output_header, &spec, &self.engine_config)
            .with_context(|| format!("transforming job '{}'", job.name))?;
        tracing::debug!(job = %job.name, bytes = report.len(), "transform complete");

        if job.deliveries.is_empty() {
            tracing::warn!(job = %job.name, "no deliveries configured, report discarded");
        }
        let run_time = Utc::now().with_timezone(&self.engine_config.timezone);
        for target in &job.deliveries {
            match target {
                DeliveryConfig::Disk(disk) => {
                    let directory = if disk.directory.is_absolute() {
                        disk.directory.clone()
                    } else {
                        self.config.base_path.join(&disk.directory)
                    };
                    let filename = delivery::render_filename(&disk.filename, &run_time);
                    delivery::write_to_disk(&report, &directory, &filename)?;
                }
                DeliveryConfig::Email(email) => {
                    let smtp = match self
                        .config
                        .load_datasource_config(&email.datasource)
                        .with_context(|| {
                            format!("resolving SMTP datasource '{}'", email.datasource)
                        })? {
                        DatasourceConfig::Smtp(smtp) => smtp,
                        _ => bail!("datasource '{}' is not an SMTP relay", email.datasource),
                    };
                    let filename = delivery::render_filename(&email.filename, &run_time);
                    delivery::send_email(&report, &smtp, email, &filename).await?;
                }
            }
        }

        tracing::info!(job = %job.name, "job complete");
        Ok(())
    }
}
