//! Attribute schema.
//!
//! The schema is built in two phases. Build logic registers attributes and
//! rules on a [`SchemaBuilder`] while configuring; [`SchemaBuilder::freeze`]
//! then produces an [`AttributeSchema`], an immutable snapshot that every
//! selector reads from. There is no way back from a frozen schema to a
//! builder, so no synchronization is needed once selection starts.

pub mod rules;

pub use rules::{
    CandidateValues, Compatibility, CompatibilityFn, CompatibilityRule, DisambiguationFn,
    DisambiguationRule,
};

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::core::{Attribute, ValueType};
use crate::util::InternedString;

/// Configuration errors raised while building a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("attribute `{name}` is already registered as {existing}, cannot register it as {requested}")]
    DuplicateAttribute {
        name: String,
        existing: String,
        requested: String,
    },

    #[error("invalid attribute precedence: `{name}` {reason}")]
    InvalidPrecedence { name: String, reason: String },

    #[error("{kind} rule `{rule}` cannot be used for {value_type} attribute `{name}`")]
    RuleTypeMismatch {
        name: String,
        kind: &'static str,
        rule: String,
        value_type: ValueType,
    },
}

/// An attribute together with its rules.
#[derive(Debug, Clone)]
pub struct AttributeRules {
    attribute: Attribute,
    compatibility: CompatibilityRule,
    disambiguation: DisambiguationRule,
}

impl AttributeRules {
    pub fn attribute(&self) -> Attribute {
        self.attribute
    }

    pub fn compatibility(&self) -> &CompatibilityRule {
        &self.compatibility
    }

    pub fn disambiguation(&self) -> &DisambiguationRule {
        &self.disambiguation
    }

    fn describe(&self) -> String {
        format!(
            "{} (compatibility: {}, disambiguation: {})",
            self.attribute.value_type(),
            self.compatibility.name(),
            self.disambiguation.name()
        )
    }
}

/// Mutable schema used while build logic is being configured.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    entries: Vec<AttributeRules>,
    by_name: BTreeMap<InternedString, usize>,
    precedence: Vec<usize>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an attribute with its rules.
    ///
    /// Registering the same attribute again with the same rules is a no-op.
    pub fn register(
        &mut self,
        attribute: Attribute,
        compatibility: CompatibilityRule,
        disambiguation: DisambiguationRule,
    ) -> Result<&mut Self, SchemaError> {
        let value_type = attribute.value_type();
        if !compatibility.applies_to(value_type) {
            return Err(SchemaError::RuleTypeMismatch {
                name: attribute.name().to_string(),
                kind: "compatibility",
                rule: compatibility.name().to_string(),
                value_type,
            });
        }
        if !disambiguation.applies_to(value_type) {
            return Err(SchemaError::RuleTypeMismatch {
                name: attribute.name().to_string(),
                kind: "disambiguation",
                rule: disambiguation.name().to_string(),
                value_type,
            });
        }

        let rules = AttributeRules {
            attribute,
            compatibility,
            disambiguation,
        };

        if let Some(&index) = self.by_name.get(&attribute.name()) {
            let existing = &self.entries[index];
            if existing.attribute == rules.attribute
                && existing.compatibility == rules.compatibility
                && existing.disambiguation == rules.disambiguation
            {
                return Ok(self);
            }
            return Err(SchemaError::DuplicateAttribute {
                name: attribute.name().to_string(),
                existing: existing.describe(),
                requested: rules.describe(),
            });
        }

        tracing::trace!("registering attribute {:?}", attribute);
        self.by_name.insert(attribute.name(), self.entries.len());
        self.entries.push(rules);
        Ok(self)
    }

    /// Register an attribute with equality compatibility and no
    /// disambiguation.
    pub fn register_default(&mut self, attribute: Attribute) -> Result<&mut Self, SchemaError> {
        self.register(
            attribute,
            CompatibilityRule::Equality,
            DisambiguationRule::None,
        )
    }

    /// Declare the attributes to consult first when breaking ties.
    ///
    /// Attributes not listed keep their registration order after the listed
    /// ones. Every listed attribute must already be registered.
    pub fn set_precedence<I>(&mut self, attributes: I) -> Result<&mut Self, SchemaError>
    where
        I: IntoIterator<Item = Attribute>,
    {
        let mut precedence = Vec::new();
        for attribute in attributes {
            let Some(&index) = self.by_name.get(&attribute.name()) else {
                return Err(SchemaError::InvalidPrecedence {
                    name: attribute.name().to_string(),
                    reason: "is not a registered attribute".to_string(),
                });
            };
            let registered = self.entries[index].attribute;
            if registered.value_type() != attribute.value_type() {
                return Err(SchemaError::InvalidPrecedence {
                    name: attribute.name().to_string(),
                    reason: format!("is registered as {}", registered.value_type()),
                });
            }
            if precedence.contains(&index) {
                return Err(SchemaError::InvalidPrecedence {
                    name: attribute.name().to_string(),
                    reason: "is listed more than once".to_string(),
                });
            }
            precedence.push(index);
        }

        self.precedence = precedence;
        Ok(self)
    }

    /// Finish configuration.
    pub fn freeze(self) -> AttributeSchema {
        let mut order = self.precedence;
        for index in 0..self.entries.len() {
            if !order.contains(&index) {
                order.push(index);
            }
        }

        tracing::debug!(
            "froze attribute schema with {} attribute(s), precedence: [{}]",
            self.entries.len(),
            order
                .iter()
                .map(|&i| self.entries[i].attribute.name().as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        AttributeSchema {
            inner: Arc::new(SchemaInner {
                entries: self.entries,
                by_name: self.by_name,
                precedence: order,
            }),
        }
    }
}

/// Immutable, shareable attribute schema.
#[derive(Debug, Clone, Default)]
pub struct AttributeSchema {
    inner: Arc<SchemaInner>,
}

#[derive(Debug, Default)]
struct SchemaInner {
    entries: Vec<AttributeRules>,
    by_name: BTreeMap<InternedString, usize>,
    precedence: Vec<usize>,
}

impl AttributeSchema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// A schema without registered attributes: everything matches by
    /// equality and nothing disambiguates.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Rules registered for `name`.
    pub fn rules(&self, name: &str) -> Option<&AttributeRules> {
        self.inner
            .by_name
            .get(name)
            .map(|&index| &self.inner.entries[index])
    }

    /// Registered attribute for `name`.
    pub fn attribute(&self, name: &str) -> Option<Attribute> {
        self.rules(name).map(|r| r.attribute)
    }

    /// Attributes in registration order.
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeRules> + '_ {
        self.inner.entries.iter()
    }

    /// Attributes in tie-breaking order.
    pub fn precedence(&self) -> impl Iterator<Item = &AttributeRules> + '_ {
        self.inner
            .precedence
            .iter()
            .map(move |&index| &self.inner.entries[index])
    }
}
