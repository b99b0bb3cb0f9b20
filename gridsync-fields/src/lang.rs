//! Locale code ↔ grid column id.
//!
//! Grid column ids cannot carry `-`, so `de-DE` is stored as `deDE`. The
//! inverse only recognises the exact `xxYY` shape; anything else passes
//! through unchanged.

/// Remove the first `-`: `en-US` → `enUS`, `fr` → `fr`.
pub fn format_language_code(code: &str) -> String {
    code.replacen('-', "", 1)
}

/// Reinsert the separator for 4-char `xxYY` ids: `deDE` → `de-DE`.
pub fn unformat_language_code(column_id: &str) -> String {
    let bytes = column_id.as_bytes();
    let shaped = bytes.len() == 4
        && bytes[..2].iter().all(u8::is_ascii_lowercase)
        && bytes[2..].iter().all(u8::is_ascii_uppercase);
    if shaped {
        format!("{}-{}", &column_id[..2], &column_id[2..])
    } else {
        column_id.to_string()
    }
}
