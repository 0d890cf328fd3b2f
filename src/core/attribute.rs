//! Attributes and attribute containers.
//!
//! An [`Attribute`] is a typed classification dimension (usage, platform,
//! target JVM version...). Requests and variants both carry an
//! [`AttributeContainer`]: an immutable name → value mapping built once through
//! [`AttributeContainerBuilder`] and shared cheaply afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::util::InternedString;

/// The type tag of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Boolean,
    Integer,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed attribute value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(InternedString),
    Boolean(bool),
    Integer(i64),
}

impl AttributeValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            AttributeValue::String(_) => ValueType::String,
            AttributeValue::Boolean(_) => ValueType::Boolean,
            AttributeValue::Integer(_) => ValueType::Integer,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            AttributeValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Convert this value to `target`, going through its string form.
    ///
    /// Returns `None` when the value has no representation in `target`
    /// (e.g. `"compile"` as an integer).
    pub fn coerce_to(self, target: ValueType) -> Option<AttributeValue> {
        if self.value_type() == target {
            return Some(self);
        }

        match (self, target) {
            (AttributeValue::Boolean(b), ValueType::String) => {
                Some(AttributeValue::String(InternedString::new(b.to_string())))
            }
            (AttributeValue::Integer(i), ValueType::String) => {
                Some(AttributeValue::String(InternedString::new(i.to_string())))
            }
            (AttributeValue::String(s), ValueType::Boolean) => match s.trim() {
                "true" => Some(AttributeValue::Boolean(true)),
                "false" => Some(AttributeValue::Boolean(false)),
                _ => None,
            },
            (AttributeValue::String(s), ValueType::Integer) => {
                s.trim().parse::<i64>().ok().map(AttributeValue::Integer)
            }
            _ => None,
        }
    }
}

impl fmt::Debug for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => write!(f, "{:?}", s.as_str()),
            AttributeValue::Boolean(b) => write!(f, "{}", b),
            AttributeValue::Integer(i) => write!(f, "{}", i),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::Boolean(b) => write!(f, "{}", b),
            AttributeValue::Integer(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(InternedString::new(s))
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(InternedString::new(s))
    }
}

impl From<InternedString> for AttributeValue {
    fn from(s: InternedString) -> Self {
        AttributeValue::String(s)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Boolean(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<i32> for AttributeValue {
    fn from(i: i32) -> Self {
        AttributeValue::Integer(i64::from(i))
    }
}

/// The identity of an attribute: its name and value type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Attribute {
    name: InternedString,
    value_type: ValueType,
}

impl Attribute {
    pub fn new(name: impl Into<InternedString>, value_type: ValueType) -> Self {
        Attribute {
            name: name.into(),
            value_type,
        }
    }

    pub fn string(name: impl Into<InternedString>) -> Self {
        Self::new(name, ValueType::String)
    }

    pub fn boolean(name: impl Into<InternedString>) -> Self {
        Self::new(name, ValueType::Boolean)
    }

    pub fn integer(name: impl Into<InternedString>) -> Self {
        Self::new(name, ValueType::Integer)
    }

    pub fn name(&self) -> InternedString {
        self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.name, self.value_type)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Errors raised while building or merging attribute containers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    #[error("attribute name cannot be empty")]
    EmptyName,

    #[error("attribute `{name}` expects a {expected} value, found {found} `{value}`")]
    TypeMismatch {
        name: String,
        expected: ValueType,
        found: ValueType,
        value: String,
    },

    #[error("attribute `{name}` is already set to `{existing}`, cannot also set `{value}`")]
    Duplicate {
        name: String,
        existing: String,
        value: String,
    },

    #[error("cannot merge attribute `{name}`: `{left}` conflicts with `{right}`")]
    ConflictingValues {
        name: String,
        left: String,
        right: String,
    },
}

/// An immutable set of attribute values keyed by attribute name.
///
/// Iteration is ordered by name, which makes every algorithm that walks a
/// container deterministic.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct AttributeContainer {
    entries: Arc<BTreeMap<InternedString, AttributeValue>>,
}

impl AttributeContainer {
    /// The empty container.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> AttributeContainerBuilder {
        AttributeContainerBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw value stored under `name`, whatever its type.
    pub fn get_raw(&self, name: &str) -> Option<AttributeValue> {
        self.entries.get(name).copied()
    }

    /// Value for `attribute`, coerced to the attribute's type.
    ///
    /// `None` means the attribute is absent. A present value that cannot be
    /// coerced is reported as `Some(Err(raw))` so callers can distinguish
    /// "missing" from "unusable".
    pub fn get(&self, attribute: &Attribute) -> Option<Result<AttributeValue, AttributeValue>> {
        self.entries
            .get(attribute.name().as_str())
            .map(|raw| raw.coerce_to(attribute.value_type()).ok_or(*raw))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (InternedString, AttributeValue)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }

    pub fn names(&self) -> impl Iterator<Item = InternedString> + '_ {
        self.entries.keys().copied()
    }

    /// Fill in `defaults` for every attribute this container does not set.
    ///
    /// `self` is the authority: its values always win.
    pub fn with_defaults(&self, defaults: &AttributeContainer) -> AttributeContainer {
        if defaults.is_empty() {
            return self.clone();
        }

        let mut entries = (*defaults.entries).clone();
        for (name, value) in self.entries.iter() {
            entries.insert(*name, *value);
        }

        AttributeContainer {
            entries: Arc::new(entries),
        }
    }

    /// Merge two containers with equal authority.
    ///
    /// Overlapping keys must hold equal values.
    pub fn try_merge(&self, other: &AttributeContainer) -> Result<AttributeContainer, AttributeError> {
        let mut entries = (*self.entries).clone();
        for (name, value) in other.entries.iter() {
            match entries.get(name) {
                Some(existing) if existing != value => {
                    return Err(AttributeError::ConflictingValues {
                        name: name.to_string(),
                        left: existing.to_string(),
                        right: value.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    entries.insert(*name, *value);
                }
            }
        }

        Ok(AttributeContainer {
            entries: Arc::new(entries),
        })
    }

    /// Render as `{name=value, ...}` for diagnostics.
    pub fn describe(&self) -> String {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{{{}}}", parts.join(", "))
    }
}

impl fmt::Debug for AttributeContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl fmt::Display for AttributeContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl Serialize for AttributeContainer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in self.entries.iter() {
            map.serialize_entry(name.as_str(), value)?;
        }
        map.end()
    }
}

/// Append-only builder for [`AttributeContainer`].
#[derive(Debug, Clone, Default)]
pub struct AttributeContainerBuilder {
    entries: BTreeMap<InternedString, AttributeValue>,
}

impl AttributeContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a typed attribute.
    ///
    /// Setting the same value twice is a no-op; a different value is an error.
    pub fn attribute(
        mut self,
        attribute: Attribute,
        value: impl Into<AttributeValue>,
    ) -> Result<Self, AttributeError> {
        let value = value.into();
        if value.value_type() != attribute.value_type() {
            return Err(AttributeError::TypeMismatch {
                name: attribute.name().to_string(),
                expected: attribute.value_type(),
                found: value.value_type(),
                value: value.to_string(),
            });
        }
        self.insert(attribute.name(), value)?;
        Ok(self)
    }

    /// Set an attribute whose type is implied by the value.
    pub fn insert(
        &mut self,
        name: impl Into<InternedString>,
        value: impl Into<AttributeValue>,
    ) -> Result<(), AttributeError> {
        let name = name.into();
        let value = value.into();

        if name.is_blank() {
            return Err(AttributeError::EmptyName);
        }

        match self.entries.get(&name) {
            Some(existing) if *existing != value => Err(AttributeError::Duplicate {
                name: name.to_string(),
                existing: existing.to_string(),
                value: value.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.entries.insert(name, value);
                Ok(())
            }
        }
    }

    pub fn build(self) -> AttributeContainer {
        AttributeContainer {
            entries: Arc::new(self.entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage() -> Attribute {
        Attribute::string("usage")
    }

    #[test]
    fn test_builder_rejects_type_mismatch() {
        let err = AttributeContainer::builder()
            .attribute(Attribute::integer("jvm.version"), "seventeen")
            .unwrap_err();

        assert!(matches!(err, AttributeError::TypeMismatch { .. }));
        assert!(err.to_string().contains("expects a integer value"));
    }

    #[test]
    fn test_builder_duplicate_same_value_is_noop() {
        let container = AttributeContainer::builder()
            .attribute(usage(), "runtime")
            .unwrap()
            .attribute(usage(), "runtime")
            .unwrap()
            .build();

        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_builder_duplicate_different_value_fails() {
        let err = AttributeContainer::builder()
            .attribute(usage(), "runtime")
            .unwrap()
            .attribute(usage(), "compile")
            .unwrap_err();

        assert_eq!(
            err,
            AttributeError::Duplicate {
                name: "usage".into(),
                existing: "runtime".into(),
                value: "compile".into(),
            }
        );
    }

    #[test]
    fn test_get_coerces_string_values() {
        let mut builder = AttributeContainerBuilder::new();
        builder.insert("jvm.version", "17").unwrap();
        builder.insert("usage", "runtime").unwrap();
        let container = builder.build();

        assert_eq!(
            container.get(&Attribute::integer("jvm.version")),
            Some(Ok(AttributeValue::Integer(17)))
        );
        assert_eq!(
            container.get(&Attribute::integer("usage")),
            Some(Err(AttributeValue::from("runtime")))
        );
        assert_eq!(container.get(&Attribute::string("missing")), None);
    }

    #[test]
    fn test_request_wins_over_defaults() {
        let request = AttributeContainer::builder()
            .attribute(usage(), "compile")
            .unwrap()
            .build();
        let defaults = AttributeContainer::builder()
            .attribute(usage(), "runtime")
            .unwrap()
            .attribute(Attribute::string("category"), "library")
            .unwrap()
            .build();

        let merged = request.with_defaults(&defaults);
        assert_eq!(merged.get_raw("usage"), Some(AttributeValue::from("compile")));
        assert_eq!(merged.get_raw("category"), Some(AttributeValue::from("library")));
    }

    #[test]
    fn test_try_merge_conflict() {
        let a = AttributeContainer::builder()
            .attribute(usage(), "compile")
            .unwrap()
            .build();
        let b = AttributeContainer::builder()
            .attribute(usage(), "runtime")
            .unwrap()
            .build();

        assert!(matches!(
            a.try_merge(&b),
            Err(AttributeError::ConflictingValues { .. })
        ));
        assert_eq!(a.try_merge(&a).unwrap(), a);
    }

    #[test]
    fn test_describe_is_ordered() {
        let mut builder = AttributeContainerBuilder::new();
        builder.insert("usage", "runtime").unwrap();
        builder.insert("category", "library").unwrap();

        assert_eq!(builder.build().describe(), "{category=library, usage=runtime}");
    }
}
