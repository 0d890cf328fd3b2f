//! Variant - one selectable set of artifacts published by a component.
//!
//! Variants are Arc-wrapped internally so that selection results and
//! capability outcomes can hand them around without copying attribute maps.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::Serialize;

use crate::core::{AttributeContainer, Capability, ComponentId};
use crate::util::InternedString;

/// A variant of a component.
///
/// Equality is by owner and name: a component never publishes two variants
/// with the same name.
#[derive(Clone)]
pub struct Variant {
    inner: Arc<VariantInner>,
}

struct VariantInner {
    owner: ComponentId,
    name: InternedString,
    attributes: AttributeContainer,
    capabilities: Vec<Capability>,
    artifacts: Vec<InternedString>,
}

impl Variant {
    /// Create a variant. An empty capability list is replaced by the owner's
    /// implicit capability.
    pub(crate) fn new(
        owner: ComponentId,
        name: InternedString,
        attributes: AttributeContainer,
        mut capabilities: Vec<Capability>,
        artifacts: Vec<InternedString>,
    ) -> Self {
        if capabilities.is_empty() {
            capabilities.push(owner.implicit_capability());
        } else {
            let mut seen = Vec::with_capacity(capabilities.len());
            capabilities.retain(|c| {
                if seen.contains(c) {
                    false
                } else {
                    seen.push(*c);
                    true
                }
            });
        }

        Variant {
            inner: Arc::new(VariantInner {
                owner,
                name,
                attributes,
                capabilities,
                artifacts,
            }),
        }
    }

    pub fn owner(&self) -> &ComponentId {
        &self.inner.owner
    }

    pub fn name(&self) -> InternedString {
        self.inner.name
    }

    pub fn attributes(&self) -> &AttributeContainer {
        &self.inner.attributes
    }

    /// Declared capabilities, never empty.
    pub fn capabilities(&self) -> &[Capability] {
        &self.inner.capabilities
    }

    pub fn artifacts(&self) -> &[InternedString] {
        &self.inner.artifacts
    }

    /// `owner (name)` for messages.
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.inner.owner, self.inner.name)
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.owner == other.inner.owner && self.inner.name == other.inner.name)
    }
}

impl Eq for Variant {}

impl Hash for Variant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.owner.hash(state);
        self.inner.name.hash(state);
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("owner", &self.inner.owner)
            .field("name", &self.inner.name)
            .field("attributes", &self.inner.attributes)
            .field("capabilities", &self.inner.capabilities)
            .finish()
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl Serialize for Variant {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        struct VariantData<'a> {
            component: String,
            name: &'a str,
            attributes: &'a AttributeContainer,
            capabilities: Vec<String>,
            artifacts: &'a [InternedString],
        }

        VariantData {
            component: self.inner.owner.to_string(),
            name: self.inner.name.as_str(),
            attributes: &self.inner.attributes,
            capabilities: self.inner.capabilities.iter().map(|c| c.to_string()).collect(),
            artifacts: &self.inner.artifacts,
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ModuleCoordinates;

    fn owner() -> ComponentId {
        ComponentId::module(ModuleCoordinates::new("com.example", "lib", "1.0"))
    }

    #[test]
    fn test_default_capability_from_owner() {
        let variant = Variant::new(
            owner(),
            "runtimeElements".into(),
            AttributeContainer::empty(),
            vec![],
            vec![],
        );

        assert_eq!(variant.capabilities().len(), 1);
        assert_eq!(variant.capabilities()[0].to_string(), "com.example:lib:1.0");
    }

    #[test]
    fn test_duplicate_capabilities_collapsed() {
        let cap = Capability::new("com.example", "feature", "1.0").unwrap();
        let variant = Variant::new(
            owner(),
            "featureElements".into(),
            AttributeContainer::empty(),
            vec![cap, cap],
            vec![],
        );

        assert_eq!(variant.capabilities(), &[cap]);
    }

    #[test]
    fn test_cheap_clone() {
        let a = Variant::new(
            owner(),
            "apiElements".into(),
            AttributeContainer::empty(),
            vec![],
            vec!["lib-1.0.jar".into()],
        );
        let b = a.clone();

        assert!(Arc::ptr_eq(&a.inner, &b.inner));
        assert_eq!(a, b);
    }
}
