//! `gridsync diff <project>`: which selected items differ from the grid.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use gridsync_core::ProjectId;
use gridsync_sync::{ChangeReason, DiffReport, SkipReason};

use super::{open_engine, print_json};

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Project id.
    pub project: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let engine = open_engine()?;
        let report = engine
            .diff_project(&ProjectId::from(self.project.as_str()))
            .with_context(|| format!("diff failed for '{}'", self.project))?;

        if self.json {
            return print_json(&report);
        }
        print_report(&self.project, &report);
        Ok(())
    }
}

fn print_report(project: &str, report: &DiffReport) {
    if report.skipped == Some(SkipReason::NoSelectedContent) {
        println!("'{project}' has no selected content.");
        return;
    }
    if report.dirty.is_empty() {
        println!("✓ '{project}' is up to date ({} items)", report.unchanged);
        return;
    }

    println!(
        "'{project}': {} items need sync, {} unchanged",
        report.dirty.len(),
        report.unchanged
    );
    for item in &report.dirty {
        println!("\n{}", item.item.to_string().bold());
        for change in &item.changes {
            let reason = match change.reason {
                ChangeReason::Missing => "not in grid".yellow(),
                ChangeReason::ContentChanged => "content changed".cyan(),
                ChangeReason::TimestampChanged => "updated since last push".normal(),
            };
            println!("  {} ({reason})", change.field);
            if let Some(preview) = &change.preview {
                for line in preview.lines() {
                    print_diff_line(line);
                }
            }
        }
    }
}

fn print_diff_line(line: &str) {
    if line.starts_with("+++") || line.starts_with("---") {
        println!("    {}", line.bold());
    } else if line.starts_with('+') {
        println!("    {}", line.green());
    } else if line.starts_with('-') {
        println!("    {}", line.red());
    } else if line.starts_with("@@") {
        println!("    {}", line.cyan());
    } else {
        println!("    {line}");
    }
}
