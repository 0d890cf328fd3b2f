//! Capability version ordering.
//!
//! Capability versions are free-form strings. Versions that parse as semver
//! (allowing missing minor/patch components) compare numerically; anything
//! else sorts after them, lexically. The unspecified version sorts lowest.

use std::cmp::Ordering;

use semver::Version;

use crate::core::UNSPECIFIED_VERSION;

/// A capability version, classified for comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityVersion {
    Unspecified,
    Semantic(Version),
    Opaque(String),
}

impl CapabilityVersion {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == UNSPECIFIED_VERSION {
            return CapabilityVersion::Unspecified;
        }
        match parse_version_lenient(raw) {
            Some(version) => CapabilityVersion::Semantic(version),
            None => CapabilityVersion::Opaque(raw.to_string()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CapabilityVersion::Unspecified => 0,
            CapabilityVersion::Semantic(_) => 1,
            CapabilityVersion::Opaque(_) => 2,
        }
    }
}

impl PartialOrd for CapabilityVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CapabilityVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (CapabilityVersion::Semantic(a), CapabilityVersion::Semantic(b)) => a.cmp(b),
            (CapabilityVersion::Opaque(a), CapabilityVersion::Opaque(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Compare two capability version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    CapabilityVersion::parse(a).cmp(&CapabilityVersion::parse(b))
}

/// Parse a version string, allowing for incomplete versions.
pub fn parse_version_lenient(s: &str) -> Option<Version> {
    if let Ok(v) = s.parse() {
        return Some(v);
    }

    let parts: Vec<&str> = s.split('.').collect();
    match parts.as_slice() {
        [major] => Some(Version::new(major.parse().ok()?, 0, 0)),
        [major, minor] => Some(Version::new(major.parse().ok()?, minor.parse().ok()?, 0)),
        _ => None,
    }
}
