//! Host platform identification.

use serde::Serialize;

/// Supported platform identifiers.
///
/// Plugins scope themselves to platforms through an explicit filter over
/// these variants rather than free-form predicates, so applicability is
/// checkable without running anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOs,
    FreeBsd,
    Solaris,
    Windows,
    Unknown,
}

impl Platform {
    /// Parse a platform from an OS identifier as reported by
    /// `std::env::consts::OS`.
    pub fn from_identifier(id: &str) -> Self {
        match id {
            "linux" | "android" => Platform::Linux,
            "macos" => Platform::MacOs,
            "freebsd" | "netbsd" | "openbsd" | "dragonfly" => Platform::FreeBsd,
            "solaris" | "illumos" => Platform::Solaris,
            "windows" => Platform::Windows,
            _ => Platform::Unknown,
        }
    }

    /// The canonical identifier string.
    pub fn identifier(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::MacOs => "macos",
            Platform::FreeBsd => "freebsd",
            Platform::Solaris => "solaris",
            Platform::Windows => "windows",
            Platform::Unknown => "unknown",
        }
    }

    /// Whether this is a Unix-family platform.
    pub fn is_unix(&self) -> bool {
        matches!(
            self,
            Platform::Linux | Platform::MacOs | Platform::FreeBsd | Platform::Solaris
        )
    }
}

/// Identify the platform this process is running on.
pub fn detect_platform() -> Platform {
    Platform::from_identifier(std::env::consts::OS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_identifier_known_platforms() {
        assert_eq!(Platform::from_identifier("linux"), Platform::Linux);
        assert_eq!(Platform::from_identifier("macos"), Platform::MacOs);
        assert_eq!(Platform::from_identifier("freebsd"), Platform::FreeBsd);
        assert_eq!(Platform::from_identifier("solaris"), Platform::Solaris);
        assert_eq!(Platform::from_identifier("illumos"), Platform::Solaris);
        assert_eq!(Platform::from_identifier("windows"), Platform::Windows);
    }

    #[test]
    fn from_identifier_unknown_platform() {
        assert_eq!(Platform::from_identifier("plan9"), Platform::Unknown);
    }

    #[test]
    fn identifier_round_trips() {
        for platform in [
            Platform::Linux,
            Platform::MacOs,
            Platform::FreeBsd,
            Platform::Solaris,
            Platform::Windows,
        ] {
            assert_eq!(Platform::from_identifier(platform.identifier()), platform);
        }
    }

    #[test]
    fn unix_family_membership() {
        assert!(Platform::Linux.is_unix());
        assert!(Platform::Solaris.is_unix());
        assert!(!Platform::Windows.is_unix());
        assert!(!Platform::Unknown.is_unix());
    }

    #[test]
    fn detect_platform_returns_something() {
        // Whatever the host is, detection must not panic
        let _ = detect_platform();
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Platform::Linux).unwrap(), "\"linux\"");
    }
}
