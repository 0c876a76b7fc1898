//! Rendering collection results for external consumers.
//!
//! The engine hands consumers an immutable nested mapping; this module
//! turns it into JSON and resolves attribute-path lookups against it.

use crate::error::Result;
use crate::tree::{AttributePath, AttributeValue};

/// Render a value as pretty-printed JSON.
pub fn to_json_pretty(value: &AttributeValue) -> Result<String> {
    Ok(serde_json::to_string_pretty(value).map_err(anyhow::Error::from)?)
}

/// Resolve `path` against a tree snapshot.
///
/// Returns `None` when any segment is missing — the caller distinguishes
/// "not set" from an explicitly empty value this way.
pub fn lookup<'a>(snapshot: &'a AttributeValue, path: &AttributePath) -> Option<&'a AttributeValue> {
    let mut current = snapshot;
    for segment in path.segments() {
        current = current.get(segment)?;
    }
    Some(current)
}
