//! `gridsync daemon`: run the background scheduler until ctrl-c.

use anyhow::{Context, Result};

use gridsync_daemon::start_blocking;

use super::home;

pub fn run() -> Result<()> {
    let home = home()?;
    start_blocking(&home).context("daemon exited with error")
}
