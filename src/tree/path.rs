//! Dotted attribute paths.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{ReconError, Result};

/// A segmented attribute path such as `lsb.id` or `virtualization.system`.
///
/// Paths are ordered and hashable so they can key the provider index and
/// serialize deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributePath {
    segments: Vec<String>,
}

impl AttributePath {
    /// Parse a dotted path. Empty paths and empty segments are rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(ReconError::InvalidPath { path: raw.into() });
        }

        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ReconError::InvalidPath { path: raw.into() });
        }

        Ok(Self { segments })
    }

    /// The path's segments in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The first segment (the namespace root).
    pub fn head(&self) -> &str {
        &self.segments[0]
    }

    /// Whether `prefix` is a prefix of this path (or equal to it).
    pub fn starts_with(&self, prefix: &AttributePath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// Whether this path and `other` share a namespace: one is a prefix
    /// of the other. A dependency on `lsb.id` overlaps a provides
    /// declaration of `lsb`, and vice versa.
    pub fn overlaps(&self, other: &AttributePath) -> bool {
        self.starts_with(other) || other.starts_with(self)
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl FromStr for AttributePath {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for AttributePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_segment() {
        let path = AttributePath::parse("hostname").unwrap();
        assert_eq!(path.segments(), ["hostname"]);
        assert_eq!(path.head(), "hostname");
    }

    #[test]
    fn parse_dotted_path() {
        let path = AttributePath::parse("lsb.id").unwrap();
        assert_eq!(path.segments(), ["lsb", "id"]);
        assert_eq!(path.head(), "lsb");
    }

    #[test]
    fn parse_rejects_empty() {
        assert!(AttributePath::parse("").is_err());
    }

    #[test]
    fn parse_rejects_empty_segment() {
        assert!(AttributePath::parse("a..b").is_err());
        assert!(AttributePath::parse(".a").is_err());
        assert!(AttributePath::parse("a.").is_err());
    }

    #[test]
    fn display_round_trips() {
        let path = AttributePath::parse("virtualization.system").unwrap();
        assert_eq!(path.to_string(), "virtualization.system");
    }

    #[test]
    fn from_str_works() {
        let path: AttributePath = "kernel.release".parse().unwrap();
        assert_eq!(path.segments(), ["kernel", "release"]);
    }

    #[test]
    fn starts_with_prefix() {
        let full = AttributePath::parse("lsb.id").unwrap();
        let prefix = AttributePath::parse("lsb").unwrap();
        assert!(full.starts_with(&prefix));
        assert!(!prefix.starts_with(&full));
        assert!(full.starts_with(&full));
    }

    #[test]
    fn starts_with_rejects_sibling() {
        let a = AttributePath::parse("lsb.id").unwrap();
        let b = AttributePath::parse("lsb.release").unwrap();
        assert!(!a.starts_with(&b));
    }

    #[test]
    fn starts_with_is_segment_wise() {
        // "lsbx" must not count as being under "lsb"
        let full = AttributePath::parse("lsbx.id").unwrap();
        let prefix = AttributePath::parse("lsb").unwrap();
        assert!(!full.starts_with(&prefix));
    }

    #[test]
    fn overlaps_both_directions() {
        let namespace = AttributePath::parse("lsb").unwrap();
        let leaf = AttributePath::parse("lsb.id").unwrap();
        assert!(namespace.overlaps(&leaf));
        assert!(leaf.overlaps(&namespace));

        let other = AttributePath::parse("kernel").unwrap();
        assert!(!namespace.overlaps(&other));
    }

    #[test]
    fn ordering_is_deterministic() {
        let mut paths = vec![
            AttributePath::parse("lsb.release").unwrap(),
            AttributePath::parse("kernel").unwrap(),
            AttributePath::parse("lsb.id").unwrap(),
        ];
        paths.sort();
        assert_eq!(paths[0].to_string(), "kernel");
        assert_eq!(paths[1].to_string(), "lsb.id");
        assert_eq!(paths[2].to_string(), "lsb.release");
    }

    #[test]
    fn serializes_as_string() {
        let path = AttributePath::parse("lsb.id").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"lsb.id\"");
    }
}
