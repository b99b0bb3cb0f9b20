pub mod config;
pub mod daemon;
pub mod diff;
pub mod import;
pub mod progress;
pub mod project;
pub mod schema;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use gridsync_daemon::init_tracing;
use gridsync_sync::Engine;

pub fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

/// Engine over the user's home, with logging set up from its settings.
pub fn open_engine() -> Result<Engine> {
    let home = home()?;
    let engine = Engine::open_at(&home).context("failed to load gridsync settings")?;
    init_tracing(engine.settings());
    Ok(engine)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize JSON output")?
    );
    Ok(())
}

pub fn format_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}
