//! `gridsync sync <project>`: push selected content to the grid.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use gridsync_core::ProjectId;
use gridsync_sync::{SkipReason, SyncMode, SyncOutcome};

use super::{open_engine, print_json};

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Project id.
    pub project: String,

    /// Push every selected item instead of only the changed ones.
    #[arg(long)]
    pub full: bool,

    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let engine = open_engine()?;
        let mode = if self.full {
            SyncMode::Full
        } else {
            SyncMode::Incremental
        };
        let outcome = engine
            .sync_project(&ProjectId::from(self.project.as_str()), mode)
            .with_context(|| format!("sync failed for '{}'", self.project))?;

        if self.json {
            return print_json(&outcome);
        }
        print_outcome(&outcome);
        Ok(())
    }
}

fn print_outcome(outcome: &SyncOutcome) {
    let id = &outcome.project;
    match (outcome.skipped, outcome.records_sent) {
        (Some(SkipReason::NoSelectedContent), _) => {
            println!("✓ '{id}': no content selected");
            return;
        }
        (Some(SkipReason::Cooldown), _) => {
            println!("✓ '{id}': synced moments ago; use --full to push anyway");
            return;
        }
        (None, 0) => {
            println!("✓ '{id}': nothing to do");
            return;
        }
        (None, sent) => println!(
            "✓ '{id}' synced ({sent} records in {} batches, {} tracked)",
            outcome.batches, outcome.total_records
        ),
    }

    for column in &outcome.schema.created_columns {
        println!("  {} column {}", "+".green(), column.id);
    }
    for dependency in &outcome.schema.created_dependencies {
        println!(
            "  {} dependency {} → {}",
            "+".green(),
            dependency.source_column_id,
            dependency.target_column_id
        );
    }
    if let Some(progress) = &outcome.progress {
        println!("  progress: {}%", progress.overall);
    }
}
