//! Field classification and value codecs for `gridsync-fields`.
//!
//! [`extract_fields`] decides which attributes of an entry are sent for
//! translation. [`detect_encoding`] decides, independently, how a field's
//! value is stored so translated text can be written back in the same shape.

pub mod blocks;
pub mod classify;
pub mod encoding;
pub mod lang;

pub use blocks::{flatten_blocks, plain_text, to_blocks};
pub use classify::{extract_fields, FieldKind, TranslatableField};
pub use encoding::{decode_value, detect_encoding, FieldEncoding};
pub use lang::{format_language_code, unformat_language_code};
