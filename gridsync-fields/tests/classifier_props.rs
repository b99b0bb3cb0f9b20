//! Property tests for field extraction and the block codec.

use gridsync_core::{Attribute, ContentSchema, Entry, FieldPolicy};
use gridsync_fields::{
    decode_value, extract_fields, flatten_blocks, FieldEncoding,
};
use proptest::prelude::*;
use serde_json::{json, Value};

fn field_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("id".to_string()),
        Just("slug".to_string()),
        Just("Slug".to_string()),
        Just("createdAt".to_string()),
        Just("locale".to_string()),
        Just("title".to_string()),
        Just("body".to_string()),
        "[a-zA-Z]{1,10}",
    ]
}

fn field_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        "\\PC{0,20}".prop_map(Value::String),
        "[a-z ]{0,20}".prop_map(|t| json!([{"type": "paragraph", "children": [{"type": "text", "text": t}]}])),
        any::<i64>().prop_map(|n| json!(n)),
        Just(Value::Null),
    ]
}

proptest! {
    #[test]
    fn never_emits_uid_or_reserved_fields(
        fields in proptest::collection::vec((field_name(), field_value(), any::<bool>()), 0..12)
    ) {
        let policy = FieldPolicy::default();
        let mut entry = Entry::new("1");
        let mut schema = ContentSchema::new("article");
        for (name, value, is_uid) in &fields {
            entry.fields.insert(name.clone(), value.clone());
            let kind = if *is_uid { "uid" } else { "string" };
            schema.attributes.insert(name.clone(), Attribute::of(kind));
        }

        let out = extract_fields(&entry, Some(&schema), &policy);
        let mut seen = std::collections::HashSet::new();
        for field in &out {
            prop_assert!(!schema.is_uid(&field.name), "uid field {} emitted", field.name);
            prop_assert!(!policy.is_excluded(&field.name), "reserved field {} emitted", field.name);
            prop_assert!(!field.text.trim().is_empty());
            prop_assert!(seen.insert(field.name.clone()), "duplicate field {}", field.name);
        }
    }

    #[test]
    fn richtext_decode_preserves_flattened_text(words in proptest::collection::vec("[a-zA-Z]{1,8}", 1..6)) {
        let blocks: Vec<Value> = words
            .iter()
            .map(|w| json!({"type": "paragraph", "children": [{"type": "text", "text": w}]}))
            .collect();
        let original = Value::Array(blocks);
        let flattened = flatten_blocks(&original);

        let decoded = decode_value(
            "content",
            &Value::String(flattened.clone()),
            &FieldEncoding::Richtext,
            &FieldPolicy::default(),
        );
        prop_assert_eq!(flatten_blocks(&decoded), flattened);
    }
}
