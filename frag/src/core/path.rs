//! Dotted-path lookup into nested data contexts.

use serde_json::Value;

/// Walk `path` (`a.b.c`) through nested objects rooted at `context`.
///
/// Returns `None` as soon as a segment is absent or an intermediate value is
/// null or not an object. Array indices and bracket notation are not
/// supported.
pub fn resolve<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(context, |current, segment| lookup_key(current, segment))
}

/// Single-level lookup of `key` in `context`, with no path splitting.
pub fn lookup_key<'a>(context: &'a Value, key: &str) -> Option<&'a Value> {
    if key.is_empty() {
        return None;
    }
    match context {
        Value::Object(map) => map.get(key),
        _ => None,
    }
}
