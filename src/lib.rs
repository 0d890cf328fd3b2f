//! Quay - attribute-based variant selection and capability arbitration
//!
//! This crate provides the core library functionality for Quay: attribute
//! schemas, variant selection, capability conflict resolution, and a
//! session driver that resolves a whole component graph.

pub mod core;
pub mod ops;
pub mod resolver;
pub mod schema;
pub mod util;

/// Test utilities for Quay unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides shorthand constructors for components and
/// on-disk project fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{
    Attribute, AttributeContainer, AttributeValue, Capability, Component, Manifest, ModuleId,
    Variant,
};
pub use resolver::{
    CapabilityConflictResolver, ResolutionSession, SelectionFailure, VariantSelector,
};
pub use schema::AttributeSchema;
pub use util::context::GlobalContext;
