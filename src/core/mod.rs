//! Core data structures.
//!
//! - Attributes and attribute containers (what is requested / provided)
//! - Capabilities (what a variant provides, for conflict detection)
//! - Components and their variants (what can be selected)
//! - The session manifest that describes a component graph on disk

pub mod attribute;
pub mod capability;
pub mod component;
pub mod manifest;
pub mod variant;

pub use attribute::{
    Attribute, AttributeContainer, AttributeContainerBuilder, AttributeError, AttributeValue,
    ValueType,
};
pub use capability::{Capability, CapabilityError, CapabilityId, UNSPECIFIED_VERSION};
pub use component::{
    Component, ComponentBuilder, ComponentError, ComponentId, ModuleCoordinates, ModuleId,
    VariantDecl,
};
pub use manifest::{find_manifest, Manifest, ManifestError, MANIFEST_NAME};
pub use variant::Variant;
