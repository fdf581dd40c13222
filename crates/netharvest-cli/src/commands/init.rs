//! Initialize a new netharvest project

use anyhow::Result;
use std::fs;
use std::path::Path;

/// Run the init command
pub async fn run(path: &str, name: Option<&str>) -> Result<()> {
    let project_dir = Path::new(path);

    // Create directory if it doesn't exist
    if !project_dir.exists() {
        fs::create_dir_all(project_dir)?;
    }

    // Get absolute path for deriving name
    let abs_path = project_dir.canonicalize()?;

    // Derive project name from directory name if not provided
    let project_name = match name {
        Some(n) => n.to_string(),
        None => abs_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not determine project name from path"))?,
    };

    // Check if already initialized
    if project_dir.join("netharvest.yaml").exists() {
        anyhow::bail!(
            "Directory '{}' already contains a netharvest.yaml",
            project_dir.display()
        );
    }

    tracing::info!("Creating new netharvest project: {}", project_name);

    // Create directory structure
    fs::create_dir_all(project_dir.join("jobs"))?;
    fs::create_dir_all(project_dir.join("datasources"))?;
    fs::create_dir_all(project_dir.join("transforms"))?;
    fs::create_dir_all(project_dir.join("mappings"))?;
    fs::create_dir_all(project_dir.join("queries"))?;
    fs::create_dir_all(project_dir.join("reports"))?;

    // Create netharvest.yaml
    let config = format!(
        r#"# Netharvest Project Configuration
name: {project_name}
version: "0.1.0"

# Field separator used across the pipeline (single ASCII character)
separator: "\t"

# Default timezone for date resolution and query windows
timezone: UTC

# Zone abbreviation table for textual dates carrying a bare abbreviation
tzinfos:
  EDT: America/New_York
  EST: America/New_York
"#
    );
    fs::write(project_dir.join("netharvest.yaml"), config)?;

    // Create example datasource
    let datasource = r#"# Datasource entries, referenced by jobs as "appliance.primary" etc.
primary:
  type: appliance
  host: appliance.example.com
  username: api_user
  password: change_me
"#;
    fs::write(project_dir.join("datasources/appliance.yaml"), datasource)?;

    // Create example job
    let example_job = r#"# Example extraction job
name: example_report
description: An example bulk extraction to get you started

datasource: appliance.primary

query:
  type: bulk
  query_file: queries/example.xml

output_header:
  - service
  - customer
  - date

transform:
  file: example_report.yaml

deliveries:
  - type: disk
    directory: reports
    filename: "example_%Y%m%d.csv"
"#;
    fs::write(project_dir.join("jobs/example_report.yaml"), example_job)?;

    // Create example transform
    let example_transform = r#"# Example transform spec
Header:
  modify_header:
    serviceName_String: service

Transformations:
  customer:
    type: simple
    mapping_file: mappings/customers.csv
    lookup_column: service
    default: "N/A"
  date:
    type: date
    lookup_column: targetTime_String
    date_format: "%m-%d-%Y"
"#;
    fs::write(
        project_dir.join("transforms/example_report.yaml"),
        example_transform,
    )?;

    // Create example lookup table
    fs::write(
        project_dir.join("mappings/customers.csv"),
        "service\tcustomer\nExample Service\tExample Customer\n",
    )?;

    // Create example query document
    fs::write(
        project_dir.join("queries/example.xml"),
        "<Query>\n  <!-- appliance bulk query document -->\n</Query>\n",
    )?;

    // Create .gitignore
    let gitignore = r#"# Generated reports
reports/

# Credentials
datasources/

# IDE
.idea/
.vscode/
*.swp
"#;
    fs::write(project_dir.join(".gitignore"), gitignore)?;

    tracing::info!(
        "Created project '{}' at {}",
        project_name,
        abs_path.display()
    );
    tracing::info!("");
    tracing::info!("Next steps:");
    if path != "." {
        tracing::info!("  cd {}", project_dir.display());
    }
    tracing::info!("  netharvest validate    # Check configuration");
    tracing::info!("  netharvest run         # Run extraction jobs");

    Ok(())
}
