//! Selection of translatable fields from an entry.
//!
//! Fields are emitted in three passes: title-like names, then body-like
//! names, then any remaining non-empty string. Within a pass, entry order is
//! kept. Excluded names, `uid` and relation attributes never appear.

use gridsync_core::{ContentSchema, Entry, FieldPolicy};
use serde::Serialize;
use serde_json::Value;

use crate::blocks::flatten_blocks;

/// Schema types that are never translated regardless of name.
const SKIPPED_TYPES: [&str; 2] = ["uid", "relation"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Title,
    Content,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslatableField {
    pub name: String,
    /// Trimmed plain text (block trees flattened).
    pub text: String,
    /// The stored value, untouched.
    pub raw: Value,
    pub kind: FieldKind,
}

pub fn extract_fields(
    entry: &Entry,
    schema: Option<&ContentSchema>,
    policy: &FieldPolicy,
) -> Vec<TranslatableField> {
    let skipped = |name: &str| {
        policy.is_excluded(name)
            || schema
                .and_then(|s| s.attribute(name))
                .map(|a| SKIPPED_TYPES.contains(&a.kind.as_str()))
                .unwrap_or(false)
    };

    let mut out: Vec<TranslatableField> = Vec::new();
    let mut push = |name: &str, text: &str, raw: &Value, kind: FieldKind| {
        let text = text.trim();
        if text.is_empty() || out.iter().any(|f| f.name == name) {
            return;
        }
        out.push(TranslatableField {
            name: name.to_string(),
            text: text.to_string(),
            raw: raw.clone(),
            kind,
        });
    };

    for (name, value) in &entry.fields {
        if policy.is_title(name) && !skipped(name) {
            if let Value::String(s) = value {
                push(name, s, value, FieldKind::Title);
            }
        }
    }

    for (name, value) in &entry.fields {
        if policy.is_content(name) && !skipped(name) {
            match value {
                Value::String(s) => push(name, s, value, FieldKind::Content),
                Value::Array(_) => push(name, &flatten_blocks(value), value, FieldKind::Content),
                _ => {}
            }
        }
    }

    for (name, value) in &entry.fields {
        if !skipped(name) {
            if let Value::String(s) = value {
                push(name, s, value, FieldKind::Other);
            }
        }
    }

    out
}
