//! Domain types for gridsync projects and grid configurations.
//!
//! All types are serializable/deserializable via serde + serde_yaml.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Registry identifier of a translation project.
    ProjectId
);
string_newtype!(
    /// Registry identifier of a grid configuration.
    ConfigId
);
string_newtype!(
    /// Content-type identifier in the content store (e.g. `api::article.article`).
    ContentType
);
string_newtype!(
    /// Entry id inside a content type. Numeric ids are kept in their string form.
    EntryId
);

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Outcome of the most recent push for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Completed,
    Failed,
}

/// Outcome of the most recent import for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Completed,
    Failed,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Completed => write!(f, "completed"),
            SyncStatus::Failed => write!(f, "failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// Credentials and target view for one remote grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    pub id: ConfigId,
    pub name: String,
    pub api_key: String,
    pub view_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GridConfig {
    /// The key with its middle masked, for display.
    pub fn masked_key(&self) -> String {
        let key = &self.api_key;
        if key.chars().count() <= 8 {
            return "****".to_string();
        }
        let head: String = key.chars().take(4).collect();
        let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
        format!("{head}…{tail}")
    }
}

/// One selected unit of translatable content inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    pub content_type: ContentType,
    pub entry_id: EntryId,
    /// Restricts extraction to these field names when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ContentRef {
    pub fn new(content_type: impl Into<ContentType>, entry_id: impl Into<EntryId>) -> Self {
        Self {
            content_type: content_type.into(),
            entry_id: entry_id.into(),
            fields: None,
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// `true` when `field` is selected (no explicit list selects everything).
    pub fn selects(&self, field: &str) -> bool {
        self.fields
            .as_ref()
            .map(|fields| fields.iter().any(|f| f == field))
            .unwrap_or(true)
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.content_type, self.entry_id)
    }
}

/// Per-target-language tracking unit of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subproject {
    pub target_language: String,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub number_of_records: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_progress_update: Option<DateTime<Utc>>,
}

impl Subproject {
    pub fn new(target_language: impl Into<String>) -> Self {
        Self {
            target_language: target_language.into(),
            progress: 0,
            number_of_records: 0,
            last_progress_update: None,
        }
    }
}

/// A translation project: selected content pushed from one source language
/// to one subproject per target language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub source_language: String,
    #[serde(default)]
    pub selected_content: Vec<ContentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigId>,
    #[serde(default)]
    pub subprojects: Vec<Subproject>,
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_status: Option<SyncStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_error: Option<String>,
    #[serde(default)]
    pub records_sent: usize,
    #[serde(default)]
    pub total_records: usize,
    #[serde(default)]
    pub overall_progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_progress_update: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_import: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_status: Option<ImportStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_error: Option<String>,
    #[serde(default)]
    pub entries_imported: usize,
}

impl Project {
    pub fn new(id: ProjectId, name: impl Into<String>, source_language: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            source_language: source_language.into(),
            selected_content: vec![],
            config: None,
            subprojects: vec![],
            created_at: Utc::now(),
            last_sync: None,
            sync_status: None,
            sync_error: None,
            records_sent: 0,
            total_records: 0,
            overall_progress: 0,
            last_progress_update: None,
            last_import: None,
            import_status: None,
            import_error: None,
            entries_imported: 0,
        }
    }

    /// Subproject languages, minus the source language, deduplicated in order.
    pub fn target_languages(&self) -> Vec<String> {
        let mut langs: Vec<String> = Vec::new();
        for sub in &self.subprojects {
            let lang = &sub.target_language;
            if lang != &self.source_language && !langs.contains(lang) {
                langs.push(lang.clone());
            }
        }
        langs
    }

    /// `true` while `now` is within `cooldown` of the last successful sync.
    pub fn cooling_down(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        let Some(last) = self.last_sync else {
            return false;
        };
        let elapsed = now.signed_duration_since(last);
        match elapsed.to_std() {
            Ok(elapsed) => elapsed < cooldown,
            // last_sync in the future (clock skew): treat as cooling down.
            Err(_) => true,
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
