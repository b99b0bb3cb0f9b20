//! `gridsync import <project>`: pull up-to-date translations into the content store.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use gridsync_core::ProjectId;
use gridsync_sync::LocaleResult;

use super::{open_engine, print_json};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Project id.
    pub project: String,

    /// Language to import; repeatable. All target languages when omitted.
    #[arg(long = "lang", value_name = "CODE")]
    pub languages: Vec<String>,

    #[arg(long)]
    pub json: bool,
}

impl ImportArgs {
    pub fn run(self) -> Result<()> {
        let engine = open_engine()?;
        let report = engine
            .import_project(&ProjectId::from(self.project.as_str()), &self.languages)
            .with_context(|| format!("import failed for '{}'", self.project))?;

        if self.json {
            return print_json(&report);
        }

        println!(
            "✓ '{}' imported ({} written, {} failed, {} records read)",
            self.project,
            report.succeeded(),
            report.failed(),
            report.total_records
        );
        for outcome in &report.results {
            let label = outcome
                .title
                .clone()
                .unwrap_or_else(|| format!("{}:{}", outcome.content_type, outcome.entry_id));
            match &outcome.result {
                LocaleResult::Updated { entry_id } => {
                    println!("  ✎  {label} [{}] → {entry_id}", outcome.locale)
                }
                LocaleResult::Created { entry_id } => {
                    println!("  {}  {label} [{}] → {entry_id}", "+".green(), outcome.locale)
                }
                LocaleResult::Failed { error } => {
                    println!("  {}  {label} [{}] {}", "✗".red(), outcome.locale, error.red())
                }
            }
        }
        Ok(())
    }
}
