//! Interned identifiers.
//!
//! Attribute names, capability coordinates and variant names are compared
//! constantly during selection, so they are interned once and compared by
//! pointer afterwards. Interned strings are `Copy`, which keeps
//! `AttributeValue` and `Capability` cheap to pass around.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::{LazyLock, PoisonError, RwLock};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Process-wide interner. Entries are leaked and never freed.
static INTERNER: LazyLock<RwLock<HashSet<&'static str>>> =
    LazyLock::new(|| RwLock::new(HashSet::new()));

/// An interned string with pointer equality.
///
/// Ordering is lexical on the content so that maps keyed by interned strings
/// iterate in a stable, reproducible order.
#[derive(Clone, Copy)]
pub struct InternedString {
    inner: &'static str,
}

impl InternedString {
    /// Intern `s`, returning the shared handle for its content.
    pub fn new(s: impl AsRef<str>) -> Self {
        let s = s.as_ref();

        {
            let interner = INTERNER.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&interned) = interner.get(s) {
                return InternedString { inner: interned };
            }
        }

        let mut interner = INTERNER.write().unwrap_or_else(PoisonError::into_inner);

        // Another writer may have won the race.
        if let Some(&interned) = interner.get(s) {
            return InternedString { inner: interned };
        }

        let leaked: &'static str = Box::leak(s.to_string().into_boxed_str());
        interner.insert(leaked);

        InternedString { inner: leaked }
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.inner
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// True if the content is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.inner.trim().is_empty()
    }
}

impl Default for InternedString {
    fn default() -> Self {
        InternedString::new("")
    }
}

impl Deref for InternedString {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        self.inner
    }
}

impl AsRef<str> for InternedString {
    #[inline]
    fn as_ref(&self) -> &str {
        self.inner
    }
}

impl Borrow<str> for InternedString {
    #[inline]
    fn borrow(&self) -> &str {
        self.inner
    }
}

impl PartialEq for InternedString {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.inner, other.inner)
    }
}

impl Eq for InternedString {}

impl PartialEq<str> for InternedString {
    fn eq(&self, other: &str) -> bool {
        self.inner == other
    }
}

impl PartialEq<&str> for InternedString {
    fn eq(&self, other: &&str) -> bool {
        self.inner == *other
    }
}

impl PartialOrd for InternedString {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InternedString {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        if std::ptr::eq(self.inner, other.inner) {
            return Ordering::Equal;
        }
        self.inner.cmp(other.inner)
    }
}

impl Hash for InternedString {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Equal content shares one address.
        std::ptr::hash(self.inner, state)
    }
}

impl fmt::Debug for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.inner, f)
    }
}

impl fmt::Display for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.inner, f)
    }
}

impl From<&str> for InternedString {
    fn from(s: &str) -> Self {
        InternedString::new(s)
    }
}

impl From<String> for InternedString {
    fn from(s: String) -> Self {
        InternedString::new(s)
    }
}

impl From<&String> for InternedString {
    fn from(s: &String) -> Self {
        InternedString::new(s)
    }
}

impl Serialize for InternedString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.inner.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for InternedString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(InternedString::new(s))
    }
}
