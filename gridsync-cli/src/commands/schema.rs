//! `gridsync schema <config>`: provision columns and dependencies on a view.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use gridsync_core::ConfigId;

use super::{open_engine, print_json};

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Configuration id.
    pub config: String,

    #[arg(long)]
    pub source: String,

    /// Target language code; repeatable.
    #[arg(long = "target", value_name = "CODE", required = true)]
    pub targets: Vec<String>,

    /// Create columns only.
    #[arg(long)]
    pub no_dependencies: bool,

    #[arg(long)]
    pub json: bool,
}

impl SchemaArgs {
    pub fn run(self) -> Result<()> {
        let engine = open_engine()?;
        let report = engine
            .ensure_schema(
                &ConfigId::from(self.config.as_str()),
                &self.source,
                &self.targets,
                !self.no_dependencies,
            )
            .with_context(|| format!("schema provisioning failed for '{}'", self.config))?;

        if self.json {
            return print_json(&report);
        }
        if report.is_empty() {
            println!("✓ View already has every column and dependency");
            return Ok(());
        }
        println!(
            "✓ Created {} columns and {} dependencies",
            report.created_columns.len(),
            report.created_dependencies.len()
        );
        for column in &report.created_columns {
            println!("  {} column {}", "+".green(), column.id);
        }
        for dependency in &report.created_dependencies {
            println!(
                "  {} dependency {} → {}",
                "+".green(),
                dependency.source_column_id,
                dependency.target_column_id
            );
        }
        Ok(())
    }
}
