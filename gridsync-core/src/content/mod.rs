//! Content store seam: entries, content-type schemas and locales.
//!
//! The sync engine reads and writes content only through [`ContentStore`].
//! Two implementations ship with the crate: [`fs::FsContentStore`] (a JSON
//! directory tree) and [`memory::MemoryContentStore`] (tests and embedding).

pub mod fs;
pub mod memory;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::types::{ContentType, EntryId};

/// Which revision of an entry a read should see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Latest revision, published or not.
    Draft,
    /// Only entries that are currently published.
    Published,
}

/// One content entry. Typed system attributes are split out; every other
/// attribute lives in `fields`, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub localizations: Vec<EntryId>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Entry {
    pub fn new(id: impl Into<EntryId>) -> Self {
        Self {
            id: id.into(),
            locale: None,
            created_at: None,
            updated_at: None,
            published_at: None,
            localizations: vec![],
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    /// First non-empty `title`/`name` string, else `Entry <id>`.
    pub fn display_title(&self) -> String {
        for wanted in ["title", "name"] {
            let found = self
                .fields
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(wanted))
                .and_then(|(_, v)| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty());
            if let Some(title) = found {
                return title.to_string();
            }
        }
        format!("Entry {}", self.id)
    }
}

/// Attribute schema of one content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSchema {
    pub content_type: ContentType,
    #[serde(default)]
    pub localized: bool,
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
}

impl ContentSchema {
    pub fn new(content_type: impl Into<ContentType>) -> Self {
        Self {
            content_type: content_type.into(),
            localized: true,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn is_uid(&self, name: &str) -> bool {
        self.attribute(name).map(Attribute::is_uid).unwrap_or(false)
    }

    /// Required `uid` attributes: these need a generated value on create.
    pub fn required_uids(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes
            .iter()
            .filter(|(_, a)| a.is_uid() && a.required)
            .map(|(n, a)| (n.as_str(), a))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// For `uid` attributes: the attribute the value is derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_field: Option<String>,
}

impl Attribute {
    pub fn of(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            custom_field: None,
            component: None,
            required: false,
            target_field: None,
        }
    }

    pub fn custom(mut self, tag: impl Into<String>) -> Self {
        self.custom_field = Some(tag.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn targeting(mut self, field: impl Into<String>) -> Self {
        self.target_field = Some(field.into());
        self
    }

    pub fn is_uid(&self) -> bool {
        self.kind == "uid"
    }
}

/// A locale configured in the content store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locale {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Payload for [`ContentStore::create_entry`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewEntry {
    pub locale: Option<String>,
    pub fields: Map<String, Value>,
    pub localizations: Vec<EntryId>,
    pub published: bool,
}

/// Narrow host interface the sync engine needs from a content store.
pub trait ContentStore: Send + Sync {
    fn get_entry(
        &self,
        content_type: &ContentType,
        id: &EntryId,
        visibility: Visibility,
    ) -> Result<Option<Entry>, StoreError>;

    fn get_schema(&self, content_type: &ContentType) -> Result<Option<ContentSchema>, StoreError>;

    /// All entries of a content type, in id order.
    fn list_entries(&self, content_type: &ContentType) -> Result<Vec<Entry>, StoreError>;

    fn create_entry(&self, content_type: &ContentType, entry: NewEntry)
        -> Result<Entry, StoreError>;

    /// Merge `patch` into the entry's fields and bump `updatedAt`.
    fn update_entry(
        &self,
        content_type: &ContentType,
        id: &EntryId,
        patch: Map<String, Value>,
    ) -> Result<Entry, StoreError>;

    /// Replace the entry's localization links.
    fn set_localizations(
        &self,
        content_type: &ContentType,
        id: &EntryId,
        links: &[EntryId],
    ) -> Result<(), StoreError>;

    fn list_locales(&self) -> Result<Vec<Locale>, StoreError>;

    /// The entries linked from `id`'s localization list. Dangling links are skipped.
    fn list_localizations(
        &self,
        content_type: &ContentType,
        id: &EntryId,
    ) -> Result<Vec<Entry>, StoreError> {
        let entry = self
            .get_entry(content_type, id, Visibility::Draft)?
            .ok_or_else(|| StoreError::EntryNotFound {
                content_type: content_type.to_string(),
                id: id.to_string(),
            })?;
        let mut siblings = Vec::with_capacity(entry.localizations.len());
        for link in &entry.localizations {
            if let Some(sibling) = self.get_entry(content_type, link, Visibility::Draft)? {
                siblings.push(sibling);
            }
        }
        Ok(siblings)
    }
}

pub(crate) fn default_locales() -> Vec<Locale> {
    vec![Locale {
        code: "en".to_string(),
        name: "English (en)".to_string(),
        is_default: true,
    }]
}

/// Next numeric id after the largest numeric id in `ids`.
pub(crate) fn next_numeric_id<'a>(ids: impl Iterator<Item = &'a EntryId>) -> EntryId {
    let max = ids.filter_map(|id| id.0.parse::<u64>().ok()).max().unwrap_or(0);
    EntryId((max + 1).to_string())
}
