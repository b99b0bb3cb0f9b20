//! `gridsync progress <project>`

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use gridsync_core::ProjectId;

use super::{open_engine, print_json};

#[derive(Args, Debug)]
pub struct ProgressArgs {
    /// Project id.
    pub project: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct ProgressRow {
    #[tabled(rename = "language")]
    language: String,
    #[tabled(rename = "translated")]
    translated: usize,
    #[tabled(rename = "total")]
    total: usize,
    #[tabled(rename = "progress")]
    percent: String,
}

impl ProgressArgs {
    pub fn run(self) -> Result<()> {
        let engine = open_engine()?;
        let report = engine
            .refresh_progress(&ProjectId::from(self.project.as_str()))
            .with_context(|| format!("progress refresh failed for '{}'", self.project))?;

        if self.json {
            return print_json(&report);
        }

        let rows: Vec<ProgressRow> = report
            .per_language
            .iter()
            .map(|p| ProgressRow {
                language: p.language.clone(),
                translated: p.translated,
                total: p.total,
                percent: format!("{}%", p.percent),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!(
            "overall: {}% ({}/{})",
            report.overall, report.translated, report.total
        );
        Ok(())
    }
}
