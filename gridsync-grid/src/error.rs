//! Error types for gridsync-grid.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    /// Missing API key or view id; no request was issued.
    #[error("grid configuration error: {0}")]
    Config(String),

    /// Non-2xx response. `message` follows [`extract_message`]; `details`
    /// is the raw response body.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        details: Value,
    },

    /// Connection, DNS, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("I/O error reading response from {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl GridError {
    /// Build an [`GridError::Api`] from a status and parsed body.
    pub fn api(status: u16, details: Value) -> Self {
        GridError::Api {
            status,
            message: extract_message(status, &details),
            details,
        }
    }

    /// Raw remote body for API errors.
    pub fn details(&self) -> Option<&Value> {
        match self {
            GridError::Api { details, .. } => Some(details),
            _ => None,
        }
    }
}

/// Human message from an error body, checked in this order:
/// `message` field, `error` field, string body, `errors` array (each item's
/// `message` or the item itself, joined with `, `), then
/// `Gridly API Error (<status>): <body as JSON>`.
///
/// An empty body yields `request failed with status code <status>`.
pub fn extract_message(status: u16, body: &Value) -> String {
    if is_empty(body) {
        return format!("request failed with status code {status}");
    }
    if let Some(message) = truthy_field(body, "message") {
        return message;
    }
    if let Some(error) = truthy_field(body, "error") {
        return error;
    }
    if let Value::String(s) = body {
        return s.clone();
    }
    if let Some(Value::Array(errors)) = body.get("errors") {
        return errors
            .iter()
            .map(|err| truthy_field(err, "message").unwrap_or_else(|| text_of(err)))
            .collect::<Vec<_>>()
            .join(", ");
    }
    format!("Gridly API Error ({status}): {body}")
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn truthy_field(value: &Value, key: &str) -> Option<String> {
    let field = value.get(key)?;
    match field {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        other => Some(text_of(other)),
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
