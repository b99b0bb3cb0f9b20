//! Error types for gridsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.gridsync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The YAML file did not exist at the expected path.
    #[error("not found: {path}")]
    NotFound { path: PathBuf },

    /// A project or configuration with the same id is already registered.
    #[error("already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// The supplied name produces an empty identifier.
    #[error("invalid name '{0}': must contain at least one letter or digit")]
    InvalidName(String),

    /// An id that is not a slug and would not map to a file in the registry.
    #[error("invalid id '{0}': expected lowercase letters, digits and dashes")]
    InvalidId(String),
}

/// Errors surfaced by [`crate::ContentStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown content type '{0}'")]
    UnknownContentType(String),

    #[error("entry {content_type}:{id} not found")]
    EntryNotFound { content_type: String, id: String },
}

/// Errors loading `settings.yaml`.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid log level '{0}'; expected one of: error, warn, info, debug")]
    InvalidLogLevel(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

pub(crate) fn registry_io(path: impl Into<PathBuf>, source: std::io::Error) -> RegistryError {
    RegistryError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn store_io(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
