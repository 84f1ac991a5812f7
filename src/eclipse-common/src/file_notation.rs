//! Flat `KEY=VALUE` notation.
//!
//! The OS keychain stores opaque strings, so small records (the session, the
//! app configuration, the project marker file) are flattened into one
//! `key=value` pair per line:
//!
//! ```text
//! access_token=eyJhbGciOi...
//! expiration_date=1700000000000
//! ```
//!
//! Decoding auto-detects value types: numbers, `true`/`false`, and JSON
//! objects/arrays become typed values; everything else stays a string.

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Number, Value};
use thiserror::Error;

/// A decoded record. Keys keep their order of appearance.
pub type Notation = IndexMap<String, Value>;

/// Errors produced while encoding or decoding notation.
#[derive(Debug, Error)]
pub enum NotationError {
    #[error("line {line}: expected KEY=VALUE, found {content:?}")]
    MalformedLine { line: usize, content: String },

    #[error("line {line}: empty key")]
    EmptyKey { line: usize },

    #[error("value for key {key:?} spans multiple lines")]
    MultilineValue { key: String },

    #[error("key {key:?} contains '=' or a line break")]
    InvalidKey { key: String },

    #[error("record must serialize to a flat object")]
    NotARecord,

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Encode a record, one `key=value\n` line per entry in insertion order.
///
/// `null` entries are skipped. Objects and arrays are written as compact JSON.
pub fn encode(record: &Notation) -> Result<String, NotationError> {
    let mut out = String::new();
    for (key, value) in record {
        if key.contains('=') || key.contains('\n') || key.contains('\r') {
            return Err(NotationError::InvalidKey { key: key.clone() });
        }
        let Some(text) = stringify(value)? else {
            continue;
        };
        if text.contains('\n') || text.contains('\r') {
            return Err(NotationError::MultilineValue { key: key.clone() });
        }
        out.push_str(key);
        out.push('=');
        out.push_str(&text);
        out.push('\n');
    }
    Ok(out)
}

/// Decode notation text into a record.
///
/// Empty lines and `#` comment lines are ignored. Each line is split on its
/// first `=`, so values may themselves contain `=`.
pub fn decode(text: &str) -> Result<Notation, NotationError> {
    let mut record = Notation::new();
    for (idx, raw_line) in text.split('\n').enumerate() {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| NotationError::MalformedLine {
                line: idx + 1,
                content: line.to_string(),
            })?;
        if key.is_empty() {
            return Err(NotationError::EmptyKey { line: idx + 1 });
        }
        record.insert(key.to_string(), coerce_value(value));
    }
    Ok(record)
}

/// Serialize any flat serde record straight to notation text.
pub fn to_notation<T: Serialize>(value: &T) -> Result<String, NotationError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => encode(&map.into_iter().collect()),
        _ => Err(NotationError::NotARecord),
    }
}

/// Decode notation text into any serde record.
pub fn from_notation<T: DeserializeOwned>(text: &str) -> Result<T, NotationError> {
    let record = decode(text)?;
    let object: serde_json::Map<String, Value> = record.into_iter().collect();
    Ok(serde_json::from_value(Value::Object(object))?)
}

/// Apply the type detection rules to a single raw value.
///
/// Order matters: numeric first, then booleans, then JSON structures.
pub fn coerce_value(raw: &str) -> Value {
    if let Some(number) = parse_number(raw) {
        return Value::Number(number);
    }
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(parsed) = serde_json::from_str::<Value>(raw)
        && (parsed.is_object() || parsed.is_array())
    {
        return parsed;
    }
    Value::String(raw.to_string())
}

fn parse_number(raw: &str) -> Option<Number> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(Number::from(int));
    }
    if let Ok(uint) = trimmed.parse::<u64>() {
        return Some(Number::from(uint));
    }
    // `f64::from_str` also accepts "inf" and "NaN"; those stay strings.
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
}

fn stringify(value: &Value) -> Result<Option<String>, NotationError> {
    Ok(match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(_) | Value::Array(_) => Some(serde_json::to_string(value)?),
    })
}

/// Deserializers tolerant of the type detection in [`decode`].
///
/// A token that happens to look like a number still belongs in a `String`
/// field.
pub mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(s),
            Value::Null => Ok(String::new()),
            other => Ok(other.to_string()),
        }
    }

    pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Ok(Some(other.to_string())),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    fn parse_port<E: serde::de::Error>(port: Port) -> Result<u16, E> {
        match port {
            Port::Number(port) => Ok(port),
            Port::Text(text) => text.trim().parse().map_err(E::custom),
        }
    }

    /// A TCP port given as a number or as numeric text.
    pub fn port<'de, D>(deserializer: D) -> Result<u16, D::Error>
    where
        D: Deserializer<'de>,
    {
        parse_port(Port::deserialize(deserializer)?)
    }

    /// Like [`port`], with null or an empty string meaning absent.
    pub fn optional_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Port>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Port::Text(text)) if text.trim().is_empty() => Ok(None),
            Some(port) => parse_port(port).map(Some),
        }
    }
}
