//! JSON shapes of the grid API (`/v1/views/{viewId}/...`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyStatus {
    UpToDate,
    OutOfDate,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub column_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_status: Option<DependencyStatus>,
}

impl Cell {
    pub fn new(column_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column_id: column_id.into(),
            value: Some(Value::String(value.into())),
            dependency_status: None,
        }
    }

    /// Cell value as text; non-string JSON is rendered compactly.
    pub fn text(&self) -> Option<String> {
        match self.value.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Up to date with its source and non-empty after trimming.
    pub fn is_translated(&self) -> bool {
        self.dependency_status == Some(DependencyStatus::UpToDate)
            && self.text().map(|t| !t.trim().is_empty()).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub cells: Vec<Cell>,
}

impl Record {
    pub fn cell(&self, column_id: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.column_id == column_id)
    }

    /// Text of the cell under `column_id`, if present and non-null.
    pub fn text(&self, column_id: &str) -> Option<String> {
        self.cell(column_id).and_then(Cell::text)
    }
}

/// A column as reported by `GET /v1/views/{viewId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_source: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_target: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localization_type: Option<LocalizationType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocalizationType {
    SourceLanguage,
    TargetLanguage,
}

/// Body of `POST /v1/views/{viewId}/columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NewColumn {
    Metadata(MetadataColumn),
    Language(LanguageColumn),
}

impl NewColumn {
    pub fn id(&self) -> &str {
        match self {
            NewColumn::Metadata(c) => &c.id,
            NewColumn::Language(c) => &c.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataColumn {
    pub id: String,
    pub editable: bool,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageColumn {
    pub id: String,
    pub editable: bool,
    pub is_source: bool,
    pub is_target: bool,
    pub language_code: String,
    pub localization_type: LocalizationType,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl LanguageColumn {
    pub fn new(id: impl Into<String>, name: impl Into<String>, is_source: bool) -> Self {
        let id = id.into();
        Self {
            language_code: id.clone(),
            id,
            editable: true,
            is_source,
            is_target: !is_source,
            localization_type: if is_source {
                LocalizationType::SourceLanguage
            } else {
                LocalizationType::TargetLanguage
            },
            name: name.into(),
            kind: "language".to_string(),
        }
    }
}

/// A source → target freshness edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub source_column_id: String,
    pub target_column_id: String,
}

impl Dependency {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_column_id: source.into(),
            target_column_id: target.into(),
        }
    }
}
