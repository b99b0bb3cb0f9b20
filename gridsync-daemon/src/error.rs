use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the scheduler and the daemon runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings error: {0}")]
    Settings(#[from] gridsync_core::SettingsError),

    #[error("sync error: {0}")]
    Sync(#[from] gridsync_sync::SyncError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("signal handler failed: {0}")]
    Signal(String),

    #[error("{task} task join failure: {message}")]
    Join { task: &'static str, message: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
