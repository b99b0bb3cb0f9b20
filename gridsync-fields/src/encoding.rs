//! Storage encoding of a field, derived from schema metadata.
//!
//! Resolution order:
//! 1. custom-field tag listed in `html_editors` → [`FieldEncoding::Html`]
//! 2. custom-field tag listed in `block_editors` → [`FieldEncoding::Richtext`]
//! 3. `richtext` / `blocks` type, a rich-text component, or a `json` field
//!    whose name contains "content" → [`FieldEncoding::Richtext`]
//! 4. `text` / `string` → [`FieldEncoding::Text`]
//! 5. a field literally named `title` → [`FieldEncoding::Title`]
//! 6. `json` → [`FieldEncoding::Json`], anything else → [`FieldEncoding::Other`]

use std::fmt;

use gridsync_core::{ContentSchema, FieldPolicy};
use serde_json::Value;

use crate::blocks::{flatten_blocks, to_blocks};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEncoding {
    Text,
    Title,
    /// Block tree.
    Richtext,
    /// Raw HTML string from a WYSIWYG editor.
    Html,
    Json,
    /// Schema type this crate has no rule for.
    Other(String),
}

impl FieldEncoding {
    /// Wire name stored in the `meta_field_type` cell.
    pub fn as_str(&self) -> &str {
        match self {
            FieldEncoding::Text => "text",
            FieldEncoding::Title => "title",
            FieldEncoding::Richtext => "richtext",
            FieldEncoding::Html => "ckeditor",
            FieldEncoding::Json => "json",
            FieldEncoding::Other(kind) => kind,
        }
    }

    /// Inverse of [`FieldEncoding::as_str`]; also accepts the legacy
    /// `string`, `blocks` and `content` spellings.
    pub fn parse(s: &str) -> Self {
        match s {
            "text" | "string" => FieldEncoding::Text,
            "title" => FieldEncoding::Title,
            "richtext" | "blocks" | "content" => FieldEncoding::Richtext,
            "ckeditor" => FieldEncoding::Html,
            "json" => FieldEncoding::Json,
            other => FieldEncoding::Other(other.to_string()),
        }
    }
}

impl fmt::Display for FieldEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoding of `field` according to `schema`; `None` when the schema does
/// not declare the attribute.
pub fn detect_encoding(
    schema: Option<&ContentSchema>,
    field: &str,
    policy: &FieldPolicy,
) -> Option<FieldEncoding> {
    let attr = schema?.attribute(field)?;

    if let Some(tag) = attr.custom_field.as_deref() {
        if policy.html_editors.iter().any(|t| t == tag) {
            return Some(FieldEncoding::Html);
        }
        if policy.block_editors.iter().any(|t| t == tag) {
            return Some(FieldEncoding::Richtext);
        }
    }

    let block_component = attr
        .component
        .as_deref()
        .map(|c| policy.block_components.iter().any(|b| b == c))
        .unwrap_or(false);
    let json_content = attr.kind == "json" && field.to_ascii_lowercase().contains("content");
    if matches!(attr.kind.as_str(), "richtext" | "blocks") || block_component || json_content {
        return Some(FieldEncoding::Richtext);
    }

    if matches!(attr.kind.as_str(), "text" | "string") {
        return Some(FieldEncoding::Text);
    }
    if field.eq_ignore_ascii_case("title") {
        return Some(FieldEncoding::Title);
    }
    if attr.kind == "json" {
        return Some(FieldEncoding::Json);
    }
    Some(FieldEncoding::Other(attr.kind.clone()))
}

/// Rebuild a stored value from translated text.
///
/// `text` may itself be a block array when a caller passes a cell value
/// through untouched; plain encodings flatten it.
pub fn decode_value(
    field: &str,
    text: &Value,
    encoding: &FieldEncoding,
    policy: &FieldPolicy,
) -> Value {
    let as_text = || match text {
        Value::String(s) => s.clone(),
        Value::Array(_) => flatten_blocks(text),
        other => other.to_string(),
    };

    match encoding {
        FieldEncoding::Text | FieldEncoding::Title | FieldEncoding::Html => Value::String(as_text()),
        FieldEncoding::Richtext => to_blocks(&as_text()),
        FieldEncoding::Json => serde_json::from_str(&as_text())
            .unwrap_or_else(|_| by_name(field, &as_text(), policy)),
        FieldEncoding::Other(_) => by_name(field, &as_text(), policy),
    }
}

fn by_name(field: &str, text: &str, policy: &FieldPolicy) -> Value {
    if policy.hints_blocks(field) {
        to_blocks(text)
    } else {
        Value::String(text.to_string())
    }
}
