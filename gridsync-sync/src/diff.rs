//! Which selected items differ from what the grid holds.
//!
//! A field is dirty when its record is missing, when the source-language
//! cell text differs from the local plain text, or when the stored
//! `meta_updated_at` differs from the entry's `updatedAt`. An item is dirty
//! when any of its fields is.

use std::collections::HashMap;

use serde::Serialize;
use similar::TextDiff;

use gridsync_core::{ContentRef, ContentStore, FieldPolicy};
use gridsync_fields::format_language_code;
use gridsync_grid::Record;

use crate::codec::{load_item_lenient, record_id, timestamp, META_UPDATED_AT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    Missing,
    ContentChanged,
    TimestampChanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub record_id: String,
    pub field: String,
    pub reason: ChangeReason,
    /// Unified diff of remote source text against local text, for changed content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemDiff {
    pub item: ContentRef,
    pub changes: Vec<FieldChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoSelectedContent,
    Cooldown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    pub dirty: Vec<ItemDiff>,
    pub unchanged: usize,
}

impl DiffReport {
    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }

    /// References of the dirty items, in selection order.
    pub fn items(&self) -> Vec<ContentRef> {
        self.dirty.iter().map(|d| d.item.clone()).collect()
    }
}

/// Compare every selected item against `remote`. Unreadable items are
/// logged and left out of both counts.
pub fn diff_items(
    remote: &[Record],
    store: &dyn ContentStore,
    references: &[ContentRef],
    source_language: &str,
    policy: &FieldPolicy,
) -> DiffReport {
    let by_id: HashMap<&str, &Record> = remote.iter().map(|r| (r.id.as_str(), r)).collect();
    let source_column = format_language_code(source_language);
    let mut report = DiffReport::default();

    for reference in references {
        let Some(item) = load_item_lenient(store, reference, policy) else {
            continue;
        };
        let local_updated = item.entry.updated_at.map(timestamp);

        let mut changes = Vec::new();
        for field in &item.fields {
            let id = record_id(&reference.content_type, &item.entry.id, &field.name);
            let Some(record) = by_id.get(id.as_str()) else {
                changes.push(FieldChange {
                    record_id: id,
                    field: field.name.clone(),
                    reason: ChangeReason::Missing,
                    preview: None,
                });
                continue;
            };

            let remote_text = record.text(&source_column).unwrap_or_default();
            if remote_text.trim() != field.text {
                let preview = unified_preview(&id, &remote_text, &field.text);
                changes.push(FieldChange {
                    record_id: id,
                    field: field.name.clone(),
                    reason: ChangeReason::ContentChanged,
                    preview: Some(preview),
                });
                continue;
            }

            if let Some(local) = &local_updated {
                if record.text(META_UPDATED_AT).as_deref() != Some(local.as_str()) {
                    changes.push(FieldChange {
                        record_id: id,
                        field: field.name.clone(),
                        reason: ChangeReason::TimestampChanged,
                        preview: None,
                    });
                }
            }
        }

        if changes.is_empty() {
            report.unchanged += 1;
        } else {
            report.dirty.push(ItemDiff {
                item: reference.clone(),
                changes,
            });
        }
    }
    report
}

fn unified_preview(record_id: &str, remote: &str, local: &str) -> String {
    let remote = format!("{remote}\n");
    let local = format!("{local}\n");
    let old_header = format!("grid/{record_id}");
    let new_header = format!("local/{record_id}");
    TextDiff::from_lines(&remote, &local)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string()
}
