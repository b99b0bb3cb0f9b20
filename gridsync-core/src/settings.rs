//! Process-wide settings from `~/.gridsync/settings.yaml`.
//!
//! A missing file yields [`Settings::default`]. `GRIDSYNC_LOG_LEVEL`
//! overrides `log_level` when set.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::policy::FieldPolicy;
use crate::registry::root_at;

pub const LOG_LEVEL_ENV: &str = "GRIDSYNC_LOG_LEVEL";
pub const DEFAULT_API_BASE_URL: &str = "https://api.gridly.com";

const LOG_LEVELS: [&str; 4] = ["error", "warn", "info", "debug"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_level: String,
    pub log_format: LogFormat,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Records per upload call.
    pub batch_size: usize,
    /// Records per page when reading the grid.
    pub page_limit: usize,
    pub sync_interval_secs: u64,
    pub warmup_secs: u64,
    pub cooldown_secs: u64,
    /// Root of the filesystem content store; `<home>/.gridsync/content` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_dir: Option<PathBuf>,
    pub field_policy: FieldPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 30,
            batch_size: 1000,
            page_limit: 2000,
            sync_interval_secs: 60,
            warmup_secs: 2,
            cooldown_secs: 30,
            content_dir: None,
            field_policy: FieldPolicy::default(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn content_dir_at(&self, home: &Path) -> PathBuf {
        self.content_dir
            .clone()
            .unwrap_or_else(|| root_at(home).join("content"))
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(SettingsError::InvalidLogLevel(self.log_level.clone()));
        }
        for (field, value) in [
            ("batch_size", self.batch_size as u64),
            ("page_limit", self.page_limit as u64),
            ("sync_interval_secs", self.sync_interval_secs),
        ] {
            if value == 0 {
                return Err(SettingsError::Zero { field });
            }
        }
        Ok(())
    }
}

/// `<home>/.gridsync/settings.yaml`: pure, no I/O.
pub fn settings_path_at(home: &Path) -> PathBuf {
    root_at(home).join("settings.yaml")
}

/// Load, apply the environment override, and validate.
pub fn load_at(home: &Path) -> Result<Settings, SettingsError> {
    let env_level = std::env::var(LOG_LEVEL_ENV).ok();
    load_with_env_at(home, env_level.as_deref())
}

/// [`load_at`] with the environment override passed in explicitly.
pub fn load_with_env_at(home: &Path, env_level: Option<&str>) -> Result<Settings, SettingsError> {
    let path = settings_path_at(home);
    let mut settings = match std::fs::read_to_string(&path) {
        Ok(contents) if contents.trim().is_empty() => Settings::default(),
        Ok(contents) => serde_yaml::from_str(&contents)
            .map_err(|source| SettingsError::Parse { path, source })?,
        Err(err) if err.kind() == ErrorKind::NotFound => Settings::default(),
        Err(source) => return Err(SettingsError::Io { path, source }),
    };
    if let Some(level) = env_level.map(str::trim).filter(|l| !l.is_empty()) {
        settings.log_level = level.to_ascii_lowercase();
    }
    settings.validate()?;
    Ok(settings)
}
