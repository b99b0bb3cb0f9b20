//! Writing finished translations back to the content store.
//!
//! Records are grouped by the `(content type, entry id)` in their metadata.
//! For each requested locale with at least one translated cell the decoded
//! fields are written to the original entry (locale equals the record's base
//! locale) or to its localized sibling, which is created when missing.

use std::collections::HashMap;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use serde_json::{Map, Value};

use gridsync_core::registry::slugify;
use gridsync_core::{
    ContentSchema, ContentStore, ContentType, Entry, EntryId, FieldPolicy, NewEntry, Visibility,
};
use gridsync_fields::{
    decode_value, detect_encoding, format_language_code, unformat_language_code, FieldEncoding,
};
use gridsync_grid::Record;

use crate::codec::{translated_text, RecordMeta};
use crate::error::SyncError;

/// Keys never sent when updating an existing entry.
const PROTECTED_KEYS: [&str; 3] = ["slug", "locale", "localizations"];

// ---------------------------------------------------------------------------
// 1. Grouping
// ---------------------------------------------------------------------------

/// Translations for one entry, keyed by locale then field name.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryGroup {
    pub content_type: ContentType,
    pub entry_id: EntryId,
    pub title: Option<String>,
    pub source_locale: String,
    pub translations: Vec<(String, Map<String, Value>)>,
}

impl EntryGroup {
    fn fields_mut(&mut self, locale: &str) -> &mut Map<String, Value> {
        let index = match self.translations.iter().position(|(l, _)| l == locale) {
            Some(index) => index,
            None => {
                self.translations.push((locale.to_string(), Map::new()));
                self.translations.len() - 1
            }
        };
        &mut self.translations[index].1
    }
}

/// Group translated cells of `records` for `target_languages`.
///
/// Records without engine metadata are ignored, as are cells that are not up
/// to date. Entries without any usable translation produce no group.
pub fn group_records(
    records: &[Record],
    target_languages: &[String],
    store: &dyn ContentStore,
    policy: &FieldPolicy,
) -> Vec<EntryGroup> {
    let columns: Vec<String> = target_languages
        .iter()
        .map(|l| format_language_code(l))
        .collect();
    let mut schemas: HashMap<ContentType, Option<ContentSchema>> = HashMap::new();
    let mut index: HashMap<(ContentType, EntryId), usize> = HashMap::new();
    let mut groups: Vec<EntryGroup> = Vec::new();

    for record in records {
        let Some(meta) = RecordMeta::read(record) else {
            continue;
        };
        let schema = schemas
            .entry(meta.content_type.clone())
            .or_insert_with(|| match store.get_schema(&meta.content_type) {
                Ok(schema) => schema,
                Err(err) => {
                    tracing::warn!(content_type = %meta.content_type, error = %err, "schema unavailable");
                    None
                }
            });
        let encoding = detect_encoding(schema.as_ref(), &meta.field_name, policy)
            .or_else(|| meta.field_type.as_deref().map(FieldEncoding::parse))
            .unwrap_or_else(|| FieldEncoding::Other(String::new()));

        for column in &columns {
            let Some(text) = translated_text(record, column) else {
                continue;
            };
            let key = (meta.content_type.clone(), meta.entry_id.clone());
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push(EntryGroup {
                    content_type: meta.content_type.clone(),
                    entry_id: meta.entry_id.clone(),
                    title: meta.entry_title.clone(),
                    source_locale: meta.base_locale.clone(),
                    translations: Vec::new(),
                });
                groups.len() - 1
            });
            let value = decode_value(&meta.field_name, &Value::String(text), &encoding, policy);
            groups[slot]
                .fields_mut(&unformat_language_code(column))
                .insert(meta.field_name.clone(), value);
        }
    }
    groups
}

// ---------------------------------------------------------------------------
// 2. Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LocaleResult {
    Updated { entry_id: EntryId },
    Created { entry_id: EntryId },
    Failed { error: String },
}

impl LocaleResult {
    pub fn is_success(&self) -> bool {
        !matches!(self, LocaleResult::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub content_type: ContentType,
    pub entry_id: EntryId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub locale: String,
    pub result: LocaleResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub total_records: usize,
    pub results: Vec<ImportOutcome>,
}

impl ImportReport {
    /// Locale writes that succeeded.
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.result.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

// ---------------------------------------------------------------------------
// 3. Write-back
// ---------------------------------------------------------------------------

/// Write every group; a failure on one locale never stops the others.
pub fn apply_groups(store: &dyn ContentStore, groups: &[EntryGroup]) -> Vec<ImportOutcome> {
    let mut outcomes = Vec::new();
    for group in groups {
        for (locale, fields) in &group.translations {
            let result = match write_locale(store, group, locale, fields.clone()) {
                Ok(result) => result,
                Err(err) => {
                    tracing::warn!(
                        content_type = %group.content_type,
                        entry = %group.entry_id,
                        locale = %locale,
                        error = %err,
                        "import failed"
                    );
                    LocaleResult::Failed {
                        error: err.to_string(),
                    }
                }
            };
            outcomes.push(ImportOutcome {
                content_type: group.content_type.clone(),
                entry_id: group.entry_id.clone(),
                title: group.title.clone(),
                locale: locale.clone(),
                result,
            });
        }
    }
    outcomes
}

fn write_locale(
    store: &dyn ContentStore,
    group: &EntryGroup,
    locale: &str,
    fields: Map<String, Value>,
) -> Result<LocaleResult, SyncError> {
    let content_type = &group.content_type;
    let schema = store.get_schema(content_type)?;
    let original = store
        .get_entry(content_type, &group.entry_id, Visibility::Draft)?
        .ok_or_else(|| SyncError::Invalid(format!("original entry {} not found", group.entry_id)))?;

    if locale == group.source_locale {
        let updated = store.update_entry(content_type, &original.id, protect(fields, schema.as_ref()))?;
        return Ok(LocaleResult::Updated {
            entry_id: updated.id,
        });
    }

    let siblings = store.list_localizations(content_type, &original.id)?;
    if let Some(existing) = siblings.iter().find(|s| s.locale.as_deref() == Some(locale)) {
        let updated = store.update_entry(content_type, &existing.id, protect(fields, schema.as_ref()))?;
        return Ok(LocaleResult::Updated {
            entry_id: updated.id,
        });
    }

    let created = create_sibling(
        store,
        content_type,
        schema.as_ref(),
        &original,
        &siblings,
        locale,
        fields,
    )?;
    Ok(LocaleResult::Created {
        entry_id: created.id,
    })
}

/// Create the `locale` sibling of `original` and link every member of the
/// localization set to every other.
fn create_sibling(
    store: &dyn ContentStore,
    content_type: &ContentType,
    schema: Option<&ContentSchema>,
    original: &Entry,
    siblings: &[Entry],
    locale: &str,
    mut fields: Map<String, Value>,
) -> Result<Entry, SyncError> {
    fields.remove("locale");
    fields.remove("localizations");

    if let Some(schema) = schema {
        for (name, attribute) in schema.required_uids() {
            let base = attribute
                .target_field
                .as_deref()
                .and_then(|target| fields.get(target).or_else(|| original.fields.get(target)))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| original.display_title());
            fields.insert(
                name.to_string(),
                Value::String(unique_slug(&base, &original.id, locale)),
            );
        }
    }

    let existing: Vec<EntryId> = siblings.iter().map(|s| s.id.clone()).collect();
    let mut links = vec![original.id.clone()];
    links.extend(existing.iter().cloned());

    let created = store.create_entry(
        content_type,
        NewEntry {
            locale: Some(locale.to_string()),
            fields,
            localizations: links,
            published: original.is_published(),
        },
    )?;

    let mut original_links = existing.clone();
    original_links.push(created.id.clone());
    store.set_localizations(content_type, &original.id, &original_links)?;

    for sibling in &existing {
        let mut links = vec![original.id.clone()];
        links.extend(existing.iter().filter(|id| *id != sibling).cloned());
        links.push(created.id.clone());
        store.set_localizations(content_type, sibling, &links)?;
    }

    tracing::info!(content_type = %content_type, entry = %created.id, locale, "created localization");
    Ok(created)
}

/// Drop keys the store owns or the user owns once set.
fn protect(mut fields: Map<String, Value>, schema: Option<&ContentSchema>) -> Map<String, Value> {
    for key in PROTECTED_KEYS {
        fields.remove(key);
    }
    if let Some(schema) = schema {
        fields.retain(|name, _| !schema.is_uid(name));
    }
    fields
}

/// `<slug of base>-<entry id>-<locale>-<6 hex chars>`.
pub fn unique_slug(base: &str, entry_id: &EntryId, locale: &str) -> String {
    let mut suffix = [0u8; 3];
    OsRng.fill_bytes(&mut suffix);
    let parts = [
        slugify(base),
        slugify(entry_id.as_str()),
        slugify(locale),
        hex::encode(suffix),
    ];
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("-")
}
