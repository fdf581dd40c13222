//! Netharvest CLI
//!
//! Project management and extraction runs.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

/// Netharvest - appliance data extraction and reshaping
#[derive(Parser)]
#[command(name = "netharvest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "netharvest.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new netharvest project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Validate configuration without running
    Validate,

    /// Run extraction jobs
    Run {
        /// Run a specific job only
        #[arg(short, long)]
        job: Option<String>,
    },

    /// Show project status
    Status,

    /// Manage jobs
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
}

#[derive(Subcommand)]
enum JobCommands {
    /// List all jobs
    List,

    /// Show job details
    Show {
        /// Job name
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Init { path, name } => {
            commands::init::run(&path, name.as_deref()).await?;
        }
        Commands::Validate => {
            commands::validate::run(&cli.config).await?;
        }
        Commands::Run { job } => {
            commands::run::run(&cli.config, job.as_deref()).await?;
        }
        Commands::Status => {
            commands::status::run(&cli.config).await?;
        }
        Commands::Job { command } => match command {
            JobCommands::List => {
                commands::job::list(&cli.config).await?;
            }
            JobCommands::Show { name } => {
                commands::job::show(&cli.config, &name).await?;
            }
        },
    }

    Ok(())
}
