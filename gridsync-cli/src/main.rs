//! gridsync: keep content-store entries and a Gridly view in sync.
//!
//! # Usage
//!
//! ```text
//! gridsync config add|list|show|remove|test
//! gridsync project create|list|show|delete
//! gridsync sync <project> [--full]
//! gridsync diff <project> [--json]
//! gridsync progress <project> [--json]
//! gridsync import <project> [--lang <code>...]
//! gridsync schema <config> --source <code> --target <code>... [--no-dependencies]
//! gridsync daemon
//! ```

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;

use commands::{
    config::ConfigCommand, diff::DiffArgs, import::ImportArgs, progress::ProgressArgs,
    project::ProjectCommand, schema::SchemaArgs, sync::SyncArgs,
};
use gridsync_sync::SyncError;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "gridsync",
    version,
    about = "Push content to a Gridly view and pull translations back",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage grid configurations (API key + view).
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Manage translation projects.
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Push a project's selected content to its grid.
    Sync(SyncArgs),

    /// Show which selected items differ from the grid.
    Diff(DiffArgs),

    /// Refresh and show translation progress.
    Progress(ProgressArgs),

    /// Write up-to-date translations back into the content store.
    Import(ImportArgs),

    /// Create missing language/metadata columns and dependencies on a view.
    Schema(SchemaArgs),

    /// Run the background sync scheduler in the foreground.
    Daemon,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Config { command } => commands::config::run(command),
        Commands::Project { command } => commands::project::run(command),
        Commands::Sync(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Progress(args) => args.run(),
        Commands::Import(args) => args.run(),
        Commands::Schema(args) => args.run(),
        Commands::Daemon => commands::daemon::run(),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

/// Print the error chain, then the structured report for engine failures.
fn report(err: &anyhow::Error) {
    eprintln!("{} {err:#}", "error:".red().bold());
    if let Some(sync) = err.downcast_ref::<SyncError>() {
        if let Ok(json) = serde_json::to_string_pretty(&sync.to_report()) {
            eprintln!("{json}");
        }
    }
}
