//! Rich-text block trees ↔ plain text.

use serde_json::{json, Value};

/// Concatenate every non-empty `text` leaf under `blocks`, separated by a space.
///
/// Non-array input flattens to an empty string.
pub fn flatten_blocks(blocks: &Value) -> String {
    let mut texts = Vec::new();
    if let Value::Array(nodes) = blocks {
        for node in nodes {
            collect_text(node, &mut texts);
        }
    }
    texts.join(" ")
}

fn collect_text<'a>(node: &'a Value, out: &mut Vec<&'a str>) {
    if node.get("type").and_then(Value::as_str) == Some("text") {
        if let Some(text) = node.get("text").and_then(Value::as_str) {
            if !text.is_empty() {
                out.push(text);
            }
        }
        return;
    }
    if let Some(Value::Array(children)) = node.get("children") {
        for child in children {
            collect_text(child, out);
        }
    }
}

/// Wrap `text` in a single-paragraph block list.
pub fn to_blocks(text: &str) -> Value {
    json!([{
        "type": "paragraph",
        "children": [{ "type": "text", "text": text }],
    }])
}

/// Plain-text view of a field value: strings as-is, block arrays flattened.
pub fn plain_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(_) => Some(flatten_blocks(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_paragraphs_and_nested_lists() {
        let blocks = json!([
            {"type": "heading", "level": 2, "children": [{"type": "text", "text": "Intro"}]},
            {"type": "paragraph", "children": [
                {"type": "text", "text": "Hello"},
                {"type": "link", "url": "https://x", "children": [{"type": "text", "text": "world"}]},
                {"type": "text", "text": ""}
            ]},
            {"type": "list", "children": [
                {"type": "list-item", "children": [{"type": "text", "text": "one"}]}
            ]},
            {"type": "image", "image": {"url": "a.png"}}
        ]);
        assert_eq!(flatten_blocks(&blocks), "Intro Hello world one");
    }

    #[test]
    fn non_array_flattens_empty() {
        assert_eq!(flatten_blocks(&json!("plain")), "");
        assert_eq!(flatten_blocks(&json!({"type": "text", "text": "x"})), "");
    }

    #[test]
    fn to_blocks_round_trips_text() {
        let text = "Bonjour tout le monde";
        assert_eq!(flatten_blocks(&to_blocks(text)), text);
    }

    #[test]
    fn plain_text_shapes() {
        assert_eq!(plain_text(&json!("a")).as_deref(), Some("a"));
        assert_eq!(plain_text(&to_blocks("b")).as_deref(), Some("b"));
        assert_eq!(plain_text(&json!(42)), None);
    }
}
