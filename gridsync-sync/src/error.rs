//! Error types for gridsync-sync.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use gridsync_core::{RegistryError, SettingsError, StoreError};
use gridsync_grid::GridError;

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the project/configuration registry.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// An error from the content store.
    #[error("content store error: {0}")]
    Store(#[from] StoreError),

    /// An error from the remote grid. Displays the remote message verbatim.
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// No usable grid configuration; nothing was sent.
    #[error("configuration error: {0}")]
    Config(String),

    /// The request itself is malformed (empty name, no languages, ...).
    #[error("invalid request: {0}")]
    Invalid(String),
}

/// Structured `{error, message, details}` payload for foreground callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    /// Stable category: `configuration`, `remote_api`, `transport`,
    /// `content_store`, `registry`, `settings` or `invalid`.
    pub error: &'static str,
    pub message: String,
    /// Raw remote response body for remote API errors, else `null`.
    pub details: Value,
}

impl SyncError {
    pub fn category(&self) -> &'static str {
        match self {
            SyncError::Registry(_) => "registry",
            SyncError::Store(_) => "content_store",
            SyncError::Grid(GridError::Config(_)) | SyncError::Config(_) => "configuration",
            SyncError::Grid(GridError::Api { .. }) => "remote_api",
            SyncError::Grid(_) => "transport",
            SyncError::Settings(_) => "settings",
            SyncError::Invalid(_) => "invalid",
        }
    }

    pub fn to_report(&self) -> ErrorReport {
        let details = match self {
            SyncError::Grid(err) => err.details().cloned().unwrap_or(Value::Null),
            _ => Value::Null,
        };
        ErrorReport {
            error: self.category(),
            message: self.to_string(),
            details,
        }
    }
}
