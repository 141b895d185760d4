use crate::action::ActionSequence;
use crate::error::{FluxaError, Result};
use crate::jsonc::strip_json_comments;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

pub const GENERATOR_NAME: &str = "Fluxa AI Tool";
pub const FORMAT_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub generated_by: String,
    pub generated_at: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
}

/// Persisted form of an action sequence: `{"_metadata": {...}, "actions": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "_metadata")]
    pub metadata: Metadata,
    pub actions: ActionSequence,
}

/// Wrap `actions` with provenance metadata.
///
/// `generated_at` defaults to now. Empty `source` or `source_kind` values are
/// left out of the metadata.
pub fn assemble(
    actions: ActionSequence,
    source: &str,
    source_kind: &str,
    generated_at: Option<DateTime<Utc>>,
) -> Envelope {
    let generated_at = generated_at
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Micros, true);
    Envelope {
        metadata: Metadata {
            generated_by: GENERATOR_NAME.to_string(),
            generated_at,
            version: FORMAT_VERSION.to_string(),
            source: non_empty(source),
            source_type: non_empty(source_kind),
        },
        actions,
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Return `value["actions"]` for envelope-shaped input, otherwise `value`
/// unchanged.
pub fn strip_metadata(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("actions") => {
            map.remove("actions").unwrap_or(Value::Null)
        }
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Formatting / files
// ---------------------------------------------------------------------------

/// Pretty-print with `indent` spaces per level. Non-ASCII text is written
/// as-is.
pub fn format_output<T: Serialize + ?Sized>(value: &T, indent: usize) -> Result<String> {
    let indent = " ".repeat(indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    // serde_json only emits valid UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn write_output(path: &Path, text: &str) -> Result<()> {
    crate::io::atomic_write(path, text.as_bytes())
}

/// Read an action file: comments stripped, envelope unwrapped.
///
/// The result is not validated.
pub fn load_actions(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&strip_json_comments(&raw))?;
    Ok(strip_metadata(value))
}

/// [`load_actions`], requiring the result to be an array.
pub fn load_action_array(path: &Path) -> Result<Vec<Value>> {
    match load_actions(path)? {
        Value::Array(items) => Ok(items),
        _ => Err(FluxaError::MissingActions(path.display().to_string())),
    }
}
