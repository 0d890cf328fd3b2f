//! Hashing utilities for fingerprinting resolution results.

use sha2::{Digest, Sha256};

use crate::core::{AttributeContainer, Variant};

/// A hasher for building fingerprints from multiple components.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    pub fn new() -> Self {
        Fingerprint {
            hasher: Sha256::new(),
        }
    }

    /// Add a string component to the fingerprint.
    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.update(s.as_bytes());
        self.hasher.update(b"\0");
        self
    }

    /// Add an attribute container. Entries are hashed in name order, with
    /// their value type, so `17` and `"17"` differ.
    pub fn update_attributes(&mut self, attributes: &AttributeContainer) -> &mut Self {
        self.hasher.update((attributes.len() as u64).to_le_bytes());
        for (name, value) in attributes.iter() {
            self.update_str(&name);
            self.update_str(value.value_type().as_str());
            self.update_str(&value.to_string());
        }
        self
    }

    /// Add everything that identifies a selected variant.
    pub fn update_variant(&mut self, variant: &Variant) -> &mut Self {
        self.update_str(&variant.owner().to_string());
        self.update_str(&variant.name());
        self.update_attributes(variant.attributes());
        self.hasher.update((variant.capabilities().len() as u64).to_le_bytes());
        for capability in variant.capabilities() {
            self.update_str(&capability.to_string());
        }
        self
    }

    /// Finalize and return the fingerprint as a hex string.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}
