//! Text rendering for data-context values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Text substituted for a placeholder that resolves to nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingValue {
    /// Absent or null lookups render as empty text.
    #[default]
    Blank,
    /// Absent or null lookups render as the literal `undefined`.
    Undefined,
}

impl MissingValue {
    pub fn as_str(self) -> &'static str {
        match self {
            MissingValue::Blank => "",
            MissingValue::Undefined => "undefined",
        }
    }
}

/// Render a resolved lookup, applying `missing` to absent and null values.
pub fn render_lookup(value: Option<&Value>, missing: MissingValue) -> String {
    match value {
        None | Some(Value::Null) => missing.as_str().to_string(),
        Some(value) => render_text(value),
    }
}

/// Textual form of a value as it appears in expanded output.
///
/// Strings are inserted verbatim, arrays join their elements with `,` and
/// objects collapse to `[object Object]`.
pub fn render_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => render_text(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}
