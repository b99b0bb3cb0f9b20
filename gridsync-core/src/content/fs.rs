//! JSON directory-tree content store.
//!
//! # Storage layout
//!
//! ```text
//! <root>/
//!   locales.json                    ([{code, name, is_default}]; absent → en only)
//!   <content_type>/
//!     schema.json                   (ContentSchema)
//!     entries/
//!       <id>.json                   (Entry, ids as strings)
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::content::{
    default_locales, next_numeric_id, ContentSchema, ContentStore, Entry, Locale, NewEntry,
    Visibility,
};
use crate::error::{store_io, StoreError};
use crate::types::{ContentType, EntryId};

#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn type_dir(&self, content_type: &ContentType) -> PathBuf {
        self.root.join(content_type.as_str())
    }

    fn entries_dir(&self, content_type: &ContentType) -> PathBuf {
        self.type_dir(content_type).join("entries")
    }

    fn entry_path(&self, content_type: &ContentType, id: &EntryId) -> PathBuf {
        self.entries_dir(content_type).join(format!("{}.json", id.0))
    }

    /// Writes a schema file, creating the type directory.
    pub fn put_schema(&self, schema: &ContentSchema) -> Result<(), StoreError> {
        let dir = self.type_dir(&schema.content_type);
        std::fs::create_dir_all(&dir).map_err(|e| store_io(&dir, e))?;
        write_json(&dir.join("schema.json"), schema)
    }

    /// Writes an entry file as-is (no timestamp bookkeeping).
    pub fn put_entry(&self, content_type: &ContentType, entry: &Entry) -> Result<(), StoreError> {
        let dir = self.entries_dir(content_type);
        std::fs::create_dir_all(&dir).map_err(|e| store_io(&dir, e))?;
        write_json(&self.entry_path(content_type, &entry.id), entry)
    }

    pub fn put_locales(&self, locales: &[Locale]) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.root).map_err(|e| store_io(&self.root, e))?;
        write_json(&self.root.join("locales.json"), &locales)
    }

    fn require_entry(&self, content_type: &ContentType, id: &EntryId) -> Result<Entry, StoreError> {
        self.get_entry(content_type, id, Visibility::Draft)?
            .ok_or_else(|| StoreError::EntryNotFound {
                content_type: content_type.to_string(),
                id: id.to_string(),
            })
    }
}

impl ContentStore for FsContentStore {
    fn get_entry(
        &self,
        content_type: &ContentType,
        id: &EntryId,
        visibility: Visibility,
    ) -> Result<Option<Entry>, StoreError> {
        let entry: Option<Entry> = read_json_opt(&self.entry_path(content_type, id))?;
        Ok(entry.filter(|e| visibility == Visibility::Draft || e.is_published()))
    }

    fn get_schema(&self, content_type: &ContentType) -> Result<Option<ContentSchema>, StoreError> {
        read_json_opt(&self.type_dir(content_type).join("schema.json"))
    }

    fn list_entries(&self, content_type: &ContentType) -> Result<Vec<Entry>, StoreError> {
        let dir = self.entries_dir(content_type);
        let read = match std::fs::read_dir(&dir) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                if self.type_dir(content_type).exists() {
                    return Ok(vec![]);
                }
                return Err(StoreError::UnknownContentType(content_type.to_string()));
            }
            Err(err) => return Err(store_io(&dir, err)),
        };

        let mut paths: Vec<PathBuf> = read
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|x| x == "json").unwrap_or(false))
            .collect();
        paths.sort();

        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(entry) = read_json_opt::<Entry>(&path)? {
                entries.push(entry);
            }
        }
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }

    fn create_entry(
        &self,
        content_type: &ContentType,
        new: NewEntry,
    ) -> Result<Entry, StoreError> {
        if !self.type_dir(content_type).exists() {
            return Err(StoreError::UnknownContentType(content_type.to_string()));
        }
        let existing = self.list_entries(content_type)?;
        let now = Utc::now();
        let entry = Entry {
            id: next_numeric_id(existing.iter().map(|e| &e.id)),
            locale: new.locale,
            created_at: Some(now),
            updated_at: Some(now),
            published_at: new.published.then_some(now),
            localizations: new.localizations,
            fields: new.fields,
        };
        self.put_entry(content_type, &entry)?;
        Ok(entry)
    }

    fn update_entry(
        &self,
        content_type: &ContentType,
        id: &EntryId,
        patch: Map<String, Value>,
    ) -> Result<Entry, StoreError> {
        let mut entry = self.require_entry(content_type, id)?;
        for (key, value) in patch {
            entry.fields.insert(key, value);
        }
        entry.updated_at = Some(Utc::now());
        self.put_entry(content_type, &entry)?;
        Ok(entry)
    }

    fn set_localizations(
        &self,
        content_type: &ContentType,
        id: &EntryId,
        links: &[EntryId],
    ) -> Result<(), StoreError> {
        let mut entry = self.require_entry(content_type, id)?;
        entry.localizations = links.to_vec();
        self.put_entry(content_type, &entry)
    }

    fn list_locales(&self) -> Result<Vec<Locale>, StoreError> {
        Ok(read_json_opt(&self.root.join("locales.json"))?.unwrap_or_else(default_locales))
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(store_io(path, err)),
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Serialize → `.tmp` sibling → `rename`.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| store_io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| store_io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Attribute;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (TempDir, FsContentStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = FsContentStore::new(dir.path());
        store
            .put_schema(
                &ContentSchema::new("article").with_attribute("title", Attribute::of("string")),
            )
            .expect("schema");
        (dir, store)
    }

    fn article() -> ContentType {
        ContentType::from("article")
    }

    #[test]
    fn create_assigns_next_id_and_timestamps() {
        let (_dir, store) = store();
        store
            .put_entry(&article(), &Entry::new("4").with_field("title", json!("Four")))
            .expect("put");

        let created = store
            .create_entry(
                &article(),
                NewEntry {
                    locale: Some("fr".into()),
                    published: true,
                    ..NewEntry::default()
                },
            )
            .expect("create");
        assert_eq!(created.id, EntryId::from("5"));
        assert!(created.is_published());
        assert_eq!(created.created_at, created.updated_at);
    }

    #[test]
    fn published_visibility_hides_drafts() {
        let (_dir, store) = store();
        store.put_entry(&article(), &Entry::new("1")).expect("put");
        let id = EntryId::from("1");
        assert!(store.get_entry(&article(), &id, Visibility::Draft).expect("get").is_some());
        assert!(store.get_entry(&article(), &id, Visibility::Published).expect("get").is_none());
    }

    #[test]
    fn update_merges_fields() {
        let (_dir, store) = store();
        store
            .put_entry(
                &article(),
                &Entry::new("1").with_field("title", json!("A")).with_field("body", json!("B")),
            )
            .expect("put");
        let mut patch = Map::new();
        patch.insert("title".into(), json!("A2"));
        let updated = store.update_entry(&article(), &EntryId::from("1"), patch).expect("update");
        assert_eq!(updated.fields["title"], json!("A2"));
        assert_eq!(updated.fields["body"], json!("B"));
        assert!(updated.updated_at.is_some());
    }

    #[test]
    fn unknown_type_and_missing_entry() {
        let (_dir, store) = store();
        let err = store.list_entries(&ContentType::from("nope")).unwrap_err();
        assert!(matches!(err, StoreError::UnknownContentType(_)));
        let err = store
            .update_entry(&article(), &EntryId::from("99"), Map::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::EntryNotFound { .. }));
    }

    #[test]
    fn locales_default_to_english() {
        let (_dir, store) = store();
        let locales = store.list_locales().expect("locales");
        assert_eq!(locales.len(), 1);
        assert_eq!(locales[0].code, "en");
    }

    #[test]
    fn corrupt_entry_reports_path() {
        let (dir, store) = store();
        let entries = dir.path().join("article").join("entries");
        std::fs::create_dir_all(&entries).expect("mkdir");
        std::fs::write(entries.join("1.json"), "{ not json").expect("write");
        let err = store
            .get_entry(&article(), &EntryId::from("1"), Visibility::Draft)
            .unwrap_err();
        assert!(err.to_string().contains("1.json"), "got: {err}");
    }
}
