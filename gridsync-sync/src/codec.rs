//! Content entries ↔ grid records.
//!
//! One translatable field becomes one record with id
//! `{contentType}_{entryId}_{fieldName}` and path
//! `{contentType}/{title}/{fieldName}`. Besides the source-language cell a
//! record carries metadata cells that let an import find its way back to the
//! entry without consulting the project.

use chrono::{DateTime, SecondsFormat, Utc};

use gridsync_core::{
    ContentRef, ContentSchema, ContentStore, ContentType, Entry, EntryId, FieldPolicy, Visibility,
};
use gridsync_fields::{
    detect_encoding, extract_fields, format_language_code, FieldEncoding, TranslatableField,
};
use gridsync_grid::{Cell, Record};

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// 1. Metadata columns
// ---------------------------------------------------------------------------

pub const META_ID: &str = "meta_id";
pub const META_CONTENT_TYPE: &str = "meta_content_type";
pub const META_FIELD_NAME: &str = "meta_field_name";
/// Written on every record; not provisioned as a column.
pub const META_FIELD_TYPE: &str = "meta_field_type";
pub const META_ENTRY_TITLE: &str = "meta_entry_title";
pub const META_CREATED_AT: &str = "meta_created_at";
pub const META_UPDATED_AT: &str = "meta_updated_at";
pub const META_BASE_LOCALE: &str = "meta_base_locale";

/// Provisioned metadata columns: `(id, name, description)`.
pub const METADATA_COLUMNS: [(&str, &str, &str); 7] = [
    (META_ID, "Meta ID", "Original entry ID"),
    (META_CONTENT_TYPE, "Meta Content Type", "Content type identifier"),
    (META_FIELD_NAME, "Meta Field Name", "Name of the translatable field"),
    (META_ENTRY_TITLE, "Meta Entry Title", "Human-readable entry title"),
    (META_CREATED_AT, "Meta Created At", "Original creation date"),
    (META_UPDATED_AT, "Meta Updated At", "Last update date"),
    (META_BASE_LOCALE, "Meta Base Locale", "Source locale code"),
];

// ---------------------------------------------------------------------------
// 2. Identity
// ---------------------------------------------------------------------------

pub fn record_id(content_type: &ContentType, entry_id: &EntryId, field: &str) -> String {
    format!("{content_type}_{entry_id}_{field}")
}

pub fn record_path(content_type: &ContentType, title: &str, field: &str) -> String {
    format!("{content_type}/{title}/{field}")
}

/// RFC 3339, millisecond precision, `Z` suffix.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------------
// 3. Loading selected content
// ---------------------------------------------------------------------------

/// A selected entry with its schema and the fields chosen for translation.
#[derive(Debug, Clone)]
pub struct LoadedItem {
    pub reference: ContentRef,
    pub entry: Entry,
    pub schema: ContentSchema,
    pub title: String,
    pub fields: Vec<TranslatableField>,
}

/// Read one selected item. `Ok(None)` when the content type or the entry no
/// longer exists; the caller skips the item.
pub fn load_item(
    store: &dyn ContentStore,
    reference: &ContentRef,
    policy: &FieldPolicy,
) -> Result<Option<LoadedItem>, SyncError> {
    let Some(schema) = store.get_schema(&reference.content_type)? else {
        tracing::warn!(item = %reference, "content type not found; skipping");
        return Ok(None);
    };
    let Some(entry) = store.get_entry(&reference.content_type, &reference.entry_id, Visibility::Draft)?
    else {
        tracing::warn!(item = %reference, "entry not found; skipping");
        return Ok(None);
    };

    let fields: Vec<TranslatableField> = extract_fields(&entry, Some(&schema), policy)
        .into_iter()
        .filter(|f| reference.selects(&f.name))
        .collect();
    if fields.is_empty() {
        tracing::warn!(item = %reference, "no translatable fields");
    }

    let title = reference
        .title
        .clone()
        .unwrap_or_else(|| entry.display_title());
    Ok(Some(LoadedItem {
        reference: reference.clone(),
        entry,
        schema,
        title,
        fields,
    }))
}

/// Like [`load_item`], but store failures are logged and the item skipped.
pub fn load_item_lenient(
    store: &dyn ContentStore,
    reference: &ContentRef,
    policy: &FieldPolicy,
) -> Option<LoadedItem> {
    match load_item(store, reference, policy) {
        Ok(item) => item,
        Err(err) => {
            tracing::warn!(item = %reference, error = %err, "failed to read selected content; skipping");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// 4. Encode
// ---------------------------------------------------------------------------

pub fn encode_field(
    item: &LoadedItem,
    field: &TranslatableField,
    source_language: &str,
    policy: &FieldPolicy,
) -> Record {
    let content_type = &item.reference.content_type;
    let entry = &item.entry;
    let encoding = detect_encoding(Some(&item.schema), &field.name, policy)
        .unwrap_or_else(|| undeclared_encoding(field));
    let now = Utc::now();
    let base_locale = entry
        .locale
        .clone()
        .unwrap_or_else(|| source_language.to_string());

    Record {
        id: record_id(content_type, &entry.id, &field.name),
        path: Some(record_path(content_type, &item.title, &field.name)),
        cells: vec![
            Cell::new(format_language_code(source_language), field.text.clone()),
            Cell::new(META_ID, entry.id.as_str()),
            Cell::new(META_CONTENT_TYPE, content_type.as_str()),
            Cell::new(META_FIELD_NAME, field.name.clone()),
            Cell::new(META_FIELD_TYPE, encoding.as_str()),
            Cell::new(META_ENTRY_TITLE, item.title.clone()),
            Cell::new(META_CREATED_AT, timestamp(entry.created_at.unwrap_or(now))),
            Cell::new(META_UPDATED_AT, timestamp(entry.updated_at.unwrap_or(now))),
            Cell::new(META_BASE_LOCALE, base_locale),
        ],
    }
}

/// Encoding of a field the schema does not declare: block trees stay block
/// trees, anything else is plain text.
fn undeclared_encoding(field: &TranslatableField) -> FieldEncoding {
    if field.raw.is_array() {
        FieldEncoding::Richtext
    } else {
        FieldEncoding::Text
    }
}

/// Records for every selected field, in selection order. Unreadable items
/// are skipped; a record id produced twice is kept once.
pub fn build_records(
    store: &dyn ContentStore,
    references: &[ContentRef],
    source_language: &str,
    policy: &FieldPolicy,
) -> Vec<Record> {
    let mut records: Vec<Record> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for reference in references {
        let Some(item) = load_item_lenient(store, reference, policy) else {
            continue;
        };
        for field in &item.fields {
            let record = encode_field(&item, field, source_language, policy);
            if seen.insert(record.id.clone()) {
                records.push(record);
            } else {
                tracing::debug!(record = %record.id, "duplicate selection ignored");
            }
        }
    }
    tracing::debug!(records = records.len(), "records prepared");
    records
}

// ---------------------------------------------------------------------------
// 5. Decode
// ---------------------------------------------------------------------------

/// Non-empty text of a metadata cell.
pub fn meta(record: &Record, column: &str) -> Option<String> {
    record.text(column).filter(|s| !s.trim().is_empty())
}

/// Metadata identifying the entry and field behind a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMeta {
    pub entry_id: EntryId,
    pub content_type: ContentType,
    pub field_name: String,
    pub base_locale: String,
    pub field_type: Option<String>,
    pub entry_title: Option<String>,
}

impl RecordMeta {
    /// `None` unless the id, content type, field name and base locale cells
    /// are all present; such records were not written by this engine.
    pub fn read(record: &Record) -> Option<Self> {
        Some(Self {
            entry_id: EntryId::from(meta(record, META_ID)?),
            content_type: ContentType::from(meta(record, META_CONTENT_TYPE)?),
            field_name: meta(record, META_FIELD_NAME)?,
            base_locale: meta(record, META_BASE_LOCALE)?,
            field_type: meta(record, META_FIELD_TYPE),
            entry_title: meta(record, META_ENTRY_TITLE),
        })
    }
}

/// Text of `column` when it counts as translated: up to date and non-empty.
pub fn translated_text(record: &Record, column: &str) -> Option<String> {
    record
        .cell(column)
        .filter(|c| c.is_translated())
        .and_then(|c| c.text())
}
