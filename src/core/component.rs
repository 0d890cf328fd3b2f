//! Components - WHO publishes variants.
//!
//! A component is identified either by module coordinates
//! (`group:name:version`) or by a local project path. It owns an ordered list
//! of variants; candidate order is preserved all the way through selection so
//! that diagnostics list candidates in publication order.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::core::{AttributeContainer, Capability, Variant};
use crate::util::InternedString;

/// `group:name` of a module, without version.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleId {
    pub group: InternedString,
    pub name: InternedString,
}

impl ModuleId {
    pub fn new(group: impl Into<InternedString>, name: impl Into<InternedString>) -> Self {
        ModuleId {
            group: group.into(),
            name: name.into(),
        }
    }
}

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

impl FromStr for ModuleId {
    type Err = ComponentError;

    /// Parse `group:name`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match split_notation(s).as_slice() {
            [group, name] => Ok(ModuleId::new(*group, *name)),
            _ => Err(ComponentError::InvalidNotation {
                notation: s.to_string(),
                expected: "group:name",
            }),
        }
    }
}

/// Module coordinates: `group:name:version`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleCoordinates {
    pub group: InternedString,
    pub name: InternedString,
    pub version: InternedString,
}

impl ModuleCoordinates {
    pub fn new(
        group: impl Into<InternedString>,
        name: impl Into<InternedString>,
        version: impl Into<InternedString>,
    ) -> Self {
        ModuleCoordinates {
            group: group.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn module(&self) -> ModuleId {
        ModuleId {
            group: self.group,
            name: self.name,
        }
    }
}

impl fmt::Debug for ModuleCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for ModuleCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

impl FromStr for ModuleCoordinates {
    type Err = ComponentError;

    /// Parse `group:name:version`. The version may be empty.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match split_notation(s).as_slice() {
            [group, name] => Ok(ModuleCoordinates::new(*group, *name, "")),
            [group, name, version] => Ok(ModuleCoordinates::new(*group, *name, *version)),
            _ => Err(ComponentError::InvalidNotation {
                notation: s.to_string(),
                expected: "group:name:version",
            }),
        }
    }
}

/// Split a `:` notation, rejecting blank parts.
fn split_notation(s: &str) -> Vec<&str> {
    let parts: Vec<&str> = s.split(':').map(str::trim).collect();
    if parts.iter().take(2).any(|p| p.is_empty()) {
        return Vec::new();
    }
    parts
}

/// Identity of a component.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentId {
    /// An external module.
    Module(ModuleCoordinates),
    /// A project of the current build. Its coordinates only feed the implicit
    /// capability.
    Project {
        path: InternedString,
        coordinates: ModuleCoordinates,
    },
}

impl ComponentId {
    pub fn module(coordinates: ModuleCoordinates) -> Self {
        ComponentId::Module(coordinates)
    }

    pub fn project(path: impl Into<InternedString>, coordinates: ModuleCoordinates) -> Self {
        ComponentId::Project {
            path: path.into(),
            coordinates,
        }
    }

    pub fn coordinates(&self) -> &ModuleCoordinates {
        match self {
            ComponentId::Module(coordinates) => coordinates,
            ComponentId::Project { coordinates, .. } => coordinates,
        }
    }

    pub fn module_id(&self) -> ModuleId {
        self.coordinates().module()
    }

    /// The capability every variant has when it declares none.
    pub fn implicit_capability(&self) -> Capability {
        let c = self.coordinates();
        Capability::implied_by(c.group, c.name, c.version)
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentId::Module(coordinates) => write!(f, "{}", coordinates),
            ComponentId::Project { path, .. } => write!(f, "project {}", path),
        }
    }
}

impl Serialize for ComponentId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    #[error("invalid module notation `{notation}`, expected `{expected}`")]
    InvalidNotation {
        notation: String,
        expected: &'static str,
    },

    #[error("component `{component}` already has a variant named `{variant}`")]
    DuplicateVariant { component: String, variant: String },

    #[error("variant name cannot be empty in component `{component}`")]
    EmptyVariantName { component: String },

    #[error("configuration `{configuration}` of `{component}` refers to unknown variant `{variant}`")]
    UnknownVariant {
        component: String,
        configuration: String,
        variant: String,
    },

    #[error("component `{component}` already defines configuration `{configuration}`")]
    DuplicateConfiguration {
        component: String,
        configuration: String,
    },
}

/// Declaration of a variant before it is attached to a component.
#[derive(Debug, Clone)]
pub struct VariantDecl {
    name: InternedString,
    attributes: AttributeContainer,
    capabilities: Vec<Capability>,
    artifacts: Vec<InternedString>,
}

impl VariantDecl {
    pub fn new(name: impl Into<InternedString>) -> Self {
        VariantDecl {
            name: name.into(),
            attributes: AttributeContainer::empty(),
            capabilities: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: AttributeContainer) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn with_artifact(mut self, artifact: impl Into<InternedString>) -> Self {
        self.artifacts.push(artifact.into());
        self
    }
}

/// A component and its published variants.
#[derive(Debug, Clone)]
pub struct Component {
    id: ComponentId,
    variants: Vec<Variant>,
    /// configuration name -> variant name
    configurations: BTreeMap<InternedString, InternedString>,
}

impl Component {
    pub fn builder(id: ComponentId) -> ComponentBuilder {
        ComponentBuilder {
            component: Component {
                id,
                variants: Vec::new(),
                configurations: BTreeMap::new(),
            },
        }
    }

    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Variants in publication order.
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn variant(&self, name: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.name() == name)
    }

    /// Look up a configuration alias, falling back to a variant of that name.
    pub fn configuration(&self, name: &str) -> Option<&Variant> {
        match self.configurations.get(name) {
            Some(variant) => self.variant(variant),
            None => self.variant(name),
        }
    }

    /// Every name accepted by [`Component::configuration`], sorted.
    pub fn configuration_names(&self) -> Vec<InternedString> {
        let mut names: Vec<InternedString> = self
            .configurations
            .keys()
            .copied()
            .chain(self.variants.iter().map(|v| v.name()))
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Builds a [`Component`], stamping each variant with the component id.
#[derive(Debug)]
pub struct ComponentBuilder {
    component: Component,
}

impl ComponentBuilder {
    pub fn variant(mut self, decl: VariantDecl) -> Result<Self, ComponentError> {
        let component = &mut self.component;

        if decl.name.is_blank() {
            return Err(ComponentError::EmptyVariantName {
                component: component.id.to_string(),
            });
        }
        if component.variant(&decl.name).is_some() {
            return Err(ComponentError::DuplicateVariant {
                component: component.id.to_string(),
                variant: decl.name.to_string(),
            });
        }

        component.variants.push(Variant::new(
            component.id,
            decl.name,
            decl.attributes,
            decl.capabilities,
            decl.artifacts,
        ));
        Ok(self)
    }

    /// Alias `configuration` to an already declared variant.
    pub fn configuration(
        mut self,
        configuration: impl Into<InternedString>,
        variant: impl Into<InternedString>,
    ) -> Result<Self, ComponentError> {
        let configuration = configuration.into();
        let variant = variant.into();
        let component = &mut self.component;

        if component.variant(&variant).is_none() {
            return Err(ComponentError::UnknownVariant {
                component: component.id.to_string(),
                configuration: configuration.to_string(),
                variant: variant.to_string(),
            });
        }
        if component.configurations.contains_key(&configuration) {
            return Err(ComponentError::DuplicateConfiguration {
                component: component.id.to_string(),
                configuration: configuration.to_string(),
            });
        }

        component.configurations.insert(configuration, variant);
        Ok(self)
    }

    pub fn build(self) -> Component {
        self.component
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lib_id() -> ComponentId {
        ComponentId::module(ModuleCoordinates::new("com.example", "lib", "1.0"))
    }

    #[test]
    fn test_variants_stamped_with_owner() {
        let component = Component::builder(lib_id())
            .variant(VariantDecl::new("apiElements"))
            .unwrap()
            .variant(VariantDecl::new("runtimeElements"))
            .unwrap()
            .build();

        assert_eq!(component.variants().len(), 2);
        assert!(component.variants().iter().all(|v| v.owner() == component.id()));
        assert_eq!(component.variants()[0].name(), "apiElements");
    }

    #[test]
    fn test_duplicate_variant_rejected() {
        let err = Component::builder(lib_id())
            .variant(VariantDecl::new("apiElements"))
            .unwrap()
            .variant(VariantDecl::new("apiElements"))
            .unwrap_err();

        assert!(matches!(err, ComponentError::DuplicateVariant { .. }));
    }

    #[test]
    fn test_configuration_alias() {
        let component = Component::builder(lib_id())
            .variant(VariantDecl::new("runtimeElements"))
            .unwrap()
            .configuration("default", "runtimeElements")
            .unwrap()
            .build();

        assert_eq!(component.configuration("default").unwrap().name(), "runtimeElements");
        assert_eq!(
            component.configuration("runtimeElements").unwrap().name(),
            "runtimeElements"
        );
        assert!(component.configuration("compile").is_none());
        assert_eq!(component.configuration_names().len(), 2);
    }

    #[test]
    fn test_configuration_requires_variant() {
        let err = Component::builder(lib_id())
            .configuration("default", "missing")
            .unwrap_err();

        assert!(matches!(err, ComponentError::UnknownVariant { .. }));
    }

    #[test]
    fn test_project_identity() {
        let id = ComponentId::project(":app", ModuleCoordinates::new("com.example", "app", ""));

        assert_eq!(id.to_string(), "project :app");
        assert_eq!(id.implicit_capability().to_string(), "com.example:app:unspecified");
    }

    #[test]
    fn test_module_notation() {
        let module: ModuleId = "com.example:lib".parse().unwrap();
        assert_eq!(module, ModuleId::new("com.example", "lib"));

        let coordinates: ModuleCoordinates = "com.example:lib:1.0".parse().unwrap();
        assert_eq!(coordinates.module(), module);
        assert_eq!(coordinates.to_string(), "com.example:lib:1.0");

        assert!("com.example".parse::<ModuleId>().is_err());
        assert!(":lib".parse::<ModuleId>().is_err());
        assert!(matches!(
            "a:b:c:d".parse::<ModuleCoordinates>(),
            Err(ComponentError::InvalidNotation { .. })
        ));
    }
}
