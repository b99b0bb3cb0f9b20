//! In-memory content store.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde_json::{Map, Value};

use crate::content::{
    default_locales, next_numeric_id, ContentSchema, ContentStore, Entry, Locale, NewEntry,
    Visibility,
};
use crate::error::StoreError;
use crate::types::{ContentType, EntryId};

#[derive(Debug, Default)]
struct Inner {
    schemas: HashMap<ContentType, ContentSchema>,
    entries: HashMap<ContentType, BTreeMap<EntryId, Entry>>,
    locales: Option<Vec<Locale>>,
}

#[derive(Debug, Default)]
pub struct MemoryContentStore {
    inner: Mutex<Inner>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locales(self, locales: Vec<Locale>) -> Self {
        self.lock().locales = Some(locales);
        self
    }

    pub fn insert_schema(&self, schema: ContentSchema) {
        let mut inner = self.lock();
        inner.entries.entry(schema.content_type.clone()).or_default();
        inner.schemas.insert(schema.content_type.clone(), schema);
    }

    /// Stores `entry` verbatim, replacing any entry with the same id.
    pub fn insert_entry(&self, content_type: impl Into<ContentType>, entry: Entry) {
        self.lock()
            .entries
            .entry(content_type.into())
            .or_default()
            .insert(entry.id.clone(), entry);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn not_found(content_type: &ContentType, id: &EntryId) -> StoreError {
    StoreError::EntryNotFound {
        content_type: content_type.to_string(),
        id: id.to_string(),
    }
}

impl ContentStore for MemoryContentStore {
    fn get_entry(
        &self,
        content_type: &ContentType,
        id: &EntryId,
        visibility: Visibility,
    ) -> Result<Option<Entry>, StoreError> {
        let inner = self.lock();
        let entry = inner
            .entries
            .get(content_type)
            .and_then(|entries| entries.get(id))
            .filter(|e| visibility == Visibility::Draft || e.is_published())
            .cloned();
        Ok(entry)
    }

    fn get_schema(&self, content_type: &ContentType) -> Result<Option<ContentSchema>, StoreError> {
        Ok(self.lock().schemas.get(content_type).cloned())
    }

    fn list_entries(&self, content_type: &ContentType) -> Result<Vec<Entry>, StoreError> {
        let inner = self.lock();
        let entries = inner
            .entries
            .get(content_type)
            .ok_or_else(|| StoreError::UnknownContentType(content_type.to_string()))?;
        Ok(entries.values().cloned().collect())
    }

    fn create_entry(
        &self,
        content_type: &ContentType,
        new: NewEntry,
    ) -> Result<Entry, StoreError> {
        let mut inner = self.lock();
        let entries = inner
            .entries
            .get_mut(content_type)
            .ok_or_else(|| StoreError::UnknownContentType(content_type.to_string()))?;
        let now = Utc::now();
        let entry = Entry {
            id: next_numeric_id(entries.keys()),
            locale: new.locale,
            created_at: Some(now),
            updated_at: Some(now),
            published_at: new.published.then_some(now),
            localizations: new.localizations,
            fields: new.fields,
        };
        entries.insert(entry.id.clone(), entry.clone());
        Ok(entry)
    }

    fn update_entry(
        &self,
        content_type: &ContentType,
        id: &EntryId,
        patch: Map<String, Value>,
    ) -> Result<Entry, StoreError> {
        let mut inner = self.lock();
        let entry = inner
            .entries
            .get_mut(content_type)
            .and_then(|entries| entries.get_mut(id))
            .ok_or_else(|| not_found(content_type, id))?;
        for (key, value) in patch {
            entry.fields.insert(key, value);
        }
        entry.updated_at = Some(Utc::now());
        Ok(entry.clone())
    }

    fn set_localizations(
        &self,
        content_type: &ContentType,
        id: &EntryId,
        links: &[EntryId],
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let entry = inner
            .entries
            .get_mut(content_type)
            .and_then(|entries| entries.get_mut(id))
            .ok_or_else(|| not_found(content_type, id))?;
        entry.localizations = links.to_vec();
        Ok(())
    }

    fn list_locales(&self) -> Result<Vec<Locale>, StoreError> {
        Ok(self.lock().locales.clone().unwrap_or_else(default_locales))
    }
}
