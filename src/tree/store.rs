//! The per-run attribute store.

use std::collections::BTreeMap;

use super::path::AttributePath;
use super::value::AttributeValue;

/// The hierarchical result store for one collection run.
///
/// The tree starts a run empty (apart from a small set of pre-seeded
/// platform-identification values) and grows monotonically: plugins add
/// attributes, nothing deletes them. [`AttributeTree::get`] never errors for
/// a missing path — absence means "not yet known or not applicable".
///
/// The store itself is single-threaded; the engine wraps it in an `RwLock`
/// and takes the write lock per [`AttributeTree::set`] call, which is what
/// makes each path write atomic under concurrent execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeTree {
    root: BTreeMap<String, AttributeValue>,
}

impl AttributeTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Read the value at `path`, if present.
    pub fn get(&self, path: &AttributePath) -> Option<&AttributeValue> {
        let mut segments = path.segments().iter();
        let mut current = self.root.get(segments.next()?.as_str())?;
        for segment in segments {
            current = current.get(segment)?;
        }
        Some(current)
    }

    /// Whether a value exists at `path`.
    pub fn contains(&self, path: &AttributePath) -> bool {
        self.get(path).is_some()
    }

    /// Insert `value` at `path`, creating intermediate mappings as needed.
    ///
    /// Writing a mapping over an existing mapping merges the new entries
    /// into the old ones (the tree grows monotonically); any other
    /// combination replaces the previous value at the path.
    pub fn set(&mut self, path: &AttributePath, value: AttributeValue) {
        let segments = path.segments();
        let mut map = &mut self.root;

        for segment in &segments[..segments.len() - 1] {
            let entry = map
                .entry(segment.clone())
                .or_insert_with(AttributeValue::map);
            if !matches!(entry, AttributeValue::Map(_)) {
                *entry = AttributeValue::map();
            }
            map = match entry {
                AttributeValue::Map(m) => m,
                _ => unreachable!("entry was just coerced to a map"),
            };
        }

        let leaf = segments[segments.len() - 1].clone();
        match (map.get_mut(&leaf), value) {
            (Some(AttributeValue::Map(existing)), AttributeValue::Map(incoming)) => {
                for (key, val) in incoming {
                    merge_into(existing, key, val);
                }
            }
            (_, value) => {
                map.insert(leaf, value);
            }
        }
    }

    /// An immutable copy of the full tree for external consumption.
    pub fn snapshot(&self) -> AttributeValue {
        AttributeValue::Map(self.root.clone())
    }
}

/// Merge a single key into a mapping, recursing when both sides are maps.
fn merge_into(target: &mut BTreeMap<String, AttributeValue>, key: String, value: AttributeValue) {
    match (target.get_mut(&key), value) {
        (Some(AttributeValue::Map(existing)), AttributeValue::Map(incoming)) => {
            for (k, v) in incoming {
                merge_into(existing, k, v);
            }
        }
        (_, value) => {
            target.insert(key, value);
        }
    }
}
