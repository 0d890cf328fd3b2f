//! Capabilities - WHAT a variant provides.
//!
//! Two variants that provide the same capability (same group and name) cannot
//! both end up in a resolved graph. Versions are only used to arbitrate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::InternedString;

/// Version sentinel for capabilities declared without a version.
pub const UNSPECIFIED_VERSION: &str = "unspecified";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("capability {field} cannot be empty")]
    Empty { field: &'static str },

    #[error("invalid capability notation `{0}`, expected `group:name[:version]`")]
    InvalidNotation(String),
}

/// The version-less identity of a capability. Conflicts are keyed on this.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CapabilityId {
    pub group: InternedString,
    pub name: InternedString,
}

impl CapabilityId {
    pub fn new(group: impl Into<InternedString>, name: impl Into<InternedString>) -> Self {
        CapabilityId {
            group: group.into(),
            name: name.into(),
        }
    }
}

impl fmt::Debug for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

impl FromStr for CapabilityId {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split(':').collect::<Vec<_>>().as_slice() {
            [group, name] if !group.trim().is_empty() && !name.trim().is_empty() => {
                Ok(CapabilityId::new(group.trim(), name.trim()))
            }
            _ => Err(CapabilityError::InvalidNotation(s.to_string())),
        }
    }
}

/// A capability provided by a variant: `(group, name, version)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Capability {
    group: InternedString,
    name: InternedString,
    version: InternedString,
}

impl Capability {
    /// Create a capability. All three parts must be non-blank.
    pub fn new(
        group: impl Into<InternedString>,
        name: impl Into<InternedString>,
        version: impl Into<InternedString>,
    ) -> Result<Self, CapabilityError> {
        let group = group.into();
        let name = name.into();
        let version = version.into();

        if group.is_blank() {
            return Err(CapabilityError::Empty { field: "group" });
        }
        if name.is_blank() {
            return Err(CapabilityError::Empty { field: "name" });
        }
        if version.is_blank() {
            return Err(CapabilityError::Empty { field: "version" });
        }

        Ok(Capability {
            group,
            name,
            version,
        })
    }

    /// Create a capability with the `unspecified` version sentinel.
    pub fn unversioned(
        group: impl Into<InternedString>,
        name: impl Into<InternedString>,
    ) -> Result<Self, CapabilityError> {
        Self::new(group, name, UNSPECIFIED_VERSION)
    }

    /// Capability implied by module coordinates. Blank versions become the
    /// `unspecified` sentinel.
    pub(crate) fn implied_by(group: InternedString, name: InternedString, version: InternedString) -> Self {
        let version = if version.is_blank() {
            InternedString::new(UNSPECIFIED_VERSION)
        } else {
            version
        };
        Capability {
            group,
            name,
            version,
        }
    }

    pub fn group(&self) -> InternedString {
        self.group
    }

    pub fn name(&self) -> InternedString {
        self.name
    }

    pub fn version(&self) -> InternedString {
        self.version
    }

    /// The version-less identity used to detect conflicts.
    pub fn id(&self) -> CapabilityId {
        CapabilityId {
            group: self.group,
            name: self.name,
        }
    }

    /// True if both capabilities have the same group and name.
    pub fn same_capability(&self, other: &Capability) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

impl FromStr for Capability {
    type Err = CapabilityError;

    /// Parse `group:name` or `group:name:version`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split(':').map(str::trim).collect::<Vec<_>>().as_slice() {
            [group, name] => Capability::unversioned(*group, *name),
            [group, name, version] => Capability::new(*group, *name, *version),
            _ => Err(CapabilityError::InvalidNotation(s.to_string())),
        }
    }
}
