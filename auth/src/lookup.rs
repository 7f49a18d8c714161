//! Nested field lookup against JSON containers.
//!
//! Field names may address nested values with dots or brackets:
//!
//! ```
//! use magic_link_auth::lookup::lookup;
//! use serde_json::json;
//!
//! let body = json!({ "user": { "email": "a@b.com", "phones": ["555-0100"] } });
//!
//! assert_eq!(lookup(&body, "user.email"), Some(&json!("a@b.com")));
//! assert_eq!(lookup(&body, "user[email]"), Some(&json!("a@b.com")));
//! assert_eq!(lookup(&body, "user[phones][0]"), Some(&json!("555-0100")));
//! assert_eq!(lookup(&body, "user.name"), None);
//! ```

use serde_json::Value;

/// Resolve `path` against `container`.
///
/// Returns `None` when any segment is missing, when an intermediate value is
/// not a container, or when the path is empty. Array elements are addressed
/// by numeric segments. A literal top-level key containing dots or brackets
/// wins over the nested interpretation.
#[must_use]
pub fn lookup<'a>(container: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    if let Some(value) = container.as_object().and_then(|map| map.get(path)) {
        return Some(value);
    }

    let mut segments = segments(path).peekable();
    segments.peek()?;

    let mut current = container;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Like [`lookup`], but treats JSON `null` and the empty string as absent.
#[must_use]
pub fn lookup_present<'a>(container: &'a Value, path: &str) -> Option<&'a Value> {
    lookup(container, path).filter(|value| !is_blank(value))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['.', '[', ']']).filter(|segment| !segment.is_empty())
}
