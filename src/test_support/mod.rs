//! Test utilities for Quay unit tests.
//!
//! Shorthand constructors for attributes, variants, and components, plus
//! on-disk project fixtures.
//!
//! # Example
//!
//! ```rust,ignore
//! use quay::test_support::{attrs, component, variant};
//!
//! let lib = component(
//!     "com.example:lib:1.0",
//!     vec![variant("runtimeElements", &[("usage", "runtime".into())])],
//! );
//! let request = attrs(&[("usage", "runtime".into())]);
//! ```

pub mod fixtures;

// Re-export fixtures for convenience
pub use fixtures::*;

use crate::core::{
    Attribute, AttributeContainer, AttributeValue, Capability, Component, ComponentId,
    ModuleCoordinates, VariantDecl,
};
use crate::schema::AttributeSchema;

/// Build an attribute container from `(name, value)` pairs.
///
/// Panics on duplicate names with different values.
pub fn attrs(entries: &[(&str, AttributeValue)]) -> AttributeContainer {
    let mut builder = AttributeContainer::builder();
    for (name, value) in entries {
        builder
            .insert(*name, *value)
            .unwrap_or_else(|e| panic!("invalid test attributes: {e}"));
    }
    builder.build()
}

/// A variant declaration carrying the given attributes.
pub fn variant(name: &str, entries: &[(&str, AttributeValue)]) -> VariantDecl {
    VariantDecl::new(name).with_attributes(attrs(entries))
}

/// A module component from `group:name:version` notation.
pub fn component(notation: &str, variants: Vec<VariantDecl>) -> Component {
    let coordinates: ModuleCoordinates = notation
        .parse()
        .unwrap_or_else(|e| panic!("invalid test coordinates `{notation}`: {e}"));
    let mut builder = Component::builder(ComponentId::module(coordinates));
    for decl in variants {
        builder = builder
            .variant(decl)
            .unwrap_or_else(|e| panic!("invalid test variant: {e}"));
    }
    builder.build()
}

/// A capability from `group:name[:version]` notation.
pub fn capability(notation: &str) -> Capability {
    notation
        .parse()
        .unwrap_or_else(|e| panic!("invalid test capability `{notation}`: {e}"))
}

/// The `usage` string attribute.
pub fn usage() -> Attribute {
    Attribute::string("usage")
}

/// Schema with `usage` and `category`, both compared by equality and
/// neither able to break ties.
pub fn usage_schema() -> AttributeSchema {
    let mut builder = AttributeSchema::builder();
    builder
        .register_default(usage())
        .and_then(|b| b.register_default(Attribute::string("category")))
        .unwrap_or_else(|e| panic!("invalid test schema: {e}"));
    builder.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers() {
        let lib = component(
            "com.example:lib:1.0",
            vec![
                variant("apiElements", &[("usage", "compile".into())]),
                variant("runtimeElements", &[("usage", "runtime".into())]),
            ],
        );
        assert_eq!(lib.variants().len(), 2);
        assert_eq!(lib.id().to_string(), "com.example:lib:1.0");

        let request = attrs(&[("usage", "runtime".into()), ("jvm.version", 17.into())]);
        assert_eq!(request.len(), 2);

        assert_eq!(capability("com.example:lib:2.0").version(), "2.0");
        assert_eq!(usage_schema().len(), 2);
    }
}
