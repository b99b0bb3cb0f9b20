//! Name- and tag-based tables that drive field classification.
//!
//! Every table can be overridden from `settings.yaml`; omitted tables keep
//! their defaults. Name matching is ASCII case-insensitive.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldPolicy {
    /// Field names never sent for translation.
    pub excluded: Vec<String>,
    /// Title-like names, classified as `title`.
    pub title_names: Vec<String>,
    /// Body-like names, classified as `content`.
    pub content_names: Vec<String>,
    /// Custom-field tags whose values are raw HTML strings.
    pub html_editors: Vec<String>,
    /// Custom-field tags whose values are block trees.
    pub block_editors: Vec<String>,
    /// Component names that hold block-tree rich text.
    pub block_components: Vec<String>,
    /// Name substrings that force block-tree decoding when the encoding is unknown.
    pub block_name_hints: Vec<String>,
}

impl Default for FieldPolicy {
    fn default() -> Self {
        Self {
            excluded: strings(&[
                "id",
                "slug",
                "createdAt",
                "updatedAt",
                "publishedAt",
                "createdBy",
                "updatedBy",
                "publishedBy",
                "locale",
                "localizations",
            ]),
            title_names: strings(&["title", "name", "headline", "label"]),
            content_names: strings(&["content", "body", "description", "text", "summary"]),
            html_editors: strings(&["plugin::ckeditor5.CKEditor", "plugin::ckeditor.CKEditor"]),
            block_editors: strings(&["plugin::editorjs.editorjs"]),
            block_components: strings(&["default.richtext"]),
            block_name_hints: strings(&["content", "body"]),
        }
    }
}

impl FieldPolicy {
    pub fn is_excluded(&self, name: &str) -> bool {
        contains_ci(&self.excluded, name)
    }

    pub fn is_title(&self, name: &str) -> bool {
        contains_ci(&self.title_names, name)
    }

    pub fn is_content(&self, name: &str) -> bool {
        contains_ci(&self.content_names, name)
    }

    /// `true` if any block-name hint occurs in `name`.
    pub fn hints_blocks(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        self.block_name_hints
            .iter()
            .any(|hint| lower.contains(&hint.to_ascii_lowercase()))
    }
}

fn contains_ci(list: &[String], name: &str) -> bool {
    list.iter().any(|item| item.eq_ignore_ascii_case(name))
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_tables_ignore_case() {
        let policy = FieldPolicy::default();
        assert!(policy.is_title("Title"));
        assert!(policy.is_content("BODY"));
        assert!(policy.is_excluded("Slug"));
        assert!(!policy.is_title("subtitle"));
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let policy: FieldPolicy = serde_yaml::from_str("title_names: [heading]\n").expect("parse");
        assert!(policy.is_title("heading"));
        assert!(!policy.is_title("title"));
        assert!(policy.is_content("body"));
    }

    #[test]
    fn block_hints_match_substrings() {
        let policy = FieldPolicy::default();
        assert!(policy.hints_blocks("LargeContent"));
        assert!(policy.hints_blocks("bodyText"));
        assert!(!policy.hints_blocks("footer"));
    }
}
