//! Variant selection.
//!
//! Picks exactly one variant of a component for a requested attribute set:
//!
//! 1. Keep candidates compatible with every requested attribute. A candidate
//!    that does not declare an attribute is compatible with any request for it.
//! 2. None left: [`FailureKind::NoCompatibleVariants`].
//! 3. One left: done, no disambiguation rule runs.
//! 4. Walk the schema precedence, letting each attribute's disambiguation
//!    rule narrow the candidates, until one is left.
//! 5. More than one left: [`FailureKind::AmbiguousVariants`].
//! 6. A rule that returns a foreign value or eliminates everything:
//!    [`FailureKind::InternalSelectionInvariant`].
//!
//! The selector holds only shared references to a frozen schema, so it is
//! `Send + Sync` and may be used from any number of threads at once.
//!
//! [`FailureKind::NoCompatibleVariants`]: crate::resolver::FailureKind::NoCompatibleVariants
//! [`FailureKind::AmbiguousVariants`]: crate::resolver::FailureKind::AmbiguousVariants
//! [`FailureKind::InternalSelectionInvariant`]: crate::resolver::FailureKind::InternalSelectionInvariant

use std::collections::BTreeSet;

use crate::core::{Attribute, AttributeContainer, AttributeValue, Component, Variant};
use crate::resolver::errors::{
    attribute_table, AmbiguousCandidate, RejectedCandidate, SelectionFailure,
};
use crate::schema::{AttributeSchema, CandidateValues, CompatibilityRule};
use crate::util::docs::DocumentationRegistry;
use crate::util::InternedString;

/// Rule used for attributes the schema does not know about.
static DEFAULT_COMPATIBILITY: CompatibilityRule = CompatibilityRule::Equality;

/// Selects variants against a frozen schema.
#[derive(Debug, Clone, Copy)]
pub struct VariantSelector<'a> {
    schema: &'a AttributeSchema,
    docs: &'a DocumentationRegistry,
}

impl<'a> VariantSelector<'a> {
    pub fn new(schema: &'a AttributeSchema, docs: &'a DocumentationRegistry) -> Self {
        VariantSelector { schema, docs }
    }

    pub fn schema(&self) -> &AttributeSchema {
        self.schema
    }

    /// Select the variant of `component` matching `requested`.
    pub fn select(
        &self,
        requested: &AttributeContainer,
        component: &Component,
    ) -> Result<Variant, SelectionFailure> {
        tracing::debug!(
            "selecting variant of {} for {} among {} candidate(s)",
            component.id(),
            requested,
            component.variants().len()
        );

        let mut compatible = Vec::new();
        let mut rejected = Vec::new();
        for variant in component.variants() {
            match self.first_incompatibility(requested, variant) {
                None => compatible.push(variant),
                Some(reason) => {
                    tracing::trace!(
                        "  {} rejected on `{}`: requested {}, provides {}",
                        variant.name(),
                        reason.attribute,
                        reason.requested,
                        reason.provided
                    );
                    rejected.push(reason);
                }
            }
        }

        match compatible.as_slice() {
            [] => Err(SelectionFailure::no_compatible_variants(
                self.docs,
                component.id(),
                requested,
                rejected,
            )),
            [only] => {
                tracing::debug!("  selected {} (single compatible candidate)", only.name());
                Ok((*only).clone())
            }
            _ => self.disambiguate(requested, component, compatible),
        }
    }

    /// Select a variant by configuration or variant name, bypassing
    /// attribute matching.
    pub fn select_configuration(
        &self,
        component: &Component,
        name: &str,
    ) -> Result<Variant, SelectionFailure> {
        component.configuration(name).cloned().ok_or_else(|| {
            SelectionFailure::configuration_not_found(
                self.docs,
                component.id(),
                name,
                component
                    .configuration_names()
                    .iter()
                    .map(|n| n.to_string())
                    .collect(),
            )
        })
    }

    /// The first requested attribute (in name order) `variant` is
    /// incompatible with, if any.
    fn first_incompatibility(
        &self,
        requested: &AttributeContainer,
        variant: &Variant,
    ) -> Option<RejectedCandidate> {
        for (name, requested_raw) in requested.iter() {
            let Some(provided_raw) = variant.attributes().get_raw(&name) else {
                continue;
            };

            let (rule, requested_value, provided_value) = match self.schema.rules(&name) {
                Some(rules) => {
                    let ty = rules.attribute().value_type();
                    (
                        rules.compatibility(),
                        requested_raw.coerce_to(ty),
                        provided_raw.coerce_to(ty),
                    )
                }
                None => (
                    &DEFAULT_COMPATIBILITY,
                    Some(requested_raw),
                    provided_raw.coerce_to(requested_raw.value_type()),
                ),
            };

            let compatible = match (requested_value, provided_value) {
                (Some(r), Some(p)) => rule.check(&r, &p).is_compatible(),
                _ => false,
            };

            if !compatible {
                return Some(RejectedCandidate {
                    variant: variant.name().to_string(),
                    attribute: name.to_string(),
                    requested: requested_raw.to_string(),
                    provided: provided_raw.to_string(),
                    attributes: attribute_table(variant.attributes()),
                });
            }
        }

        None
    }

    fn disambiguate(
        &self,
        requested: &AttributeContainer,
        component: &Component,
        mut remaining: Vec<&Variant>,
    ) -> Result<Variant, SelectionFailure> {
        for rules in self.schema.precedence() {
            if remaining.len() == 1 {
                break;
            }

            let attribute = rules.attribute();
            let values: Vec<Option<AttributeValue>> = remaining
                .iter()
                .map(|v| candidate_value(v.attributes(), &attribute))
                .collect();
            if values.iter().all(Option::is_none) {
                continue;
            }

            let input: CandidateValues = values.iter().copied().collect();
            let requested_value = requested.get(&attribute).and_then(Result::ok);
            let rule = rules.disambiguation();
            let preferred = rule.apply(requested_value.as_ref(), &input);

            if let Some(foreign) = preferred.iter().find(|v| !input.contains(*v)) {
                return Err(SelectionFailure::internal_invariant(
                    self.docs,
                    Some(component.id()),
                    Some(attribute.name().as_str()),
                    rule.name(),
                    format!(
                        "returned {} which was not among the candidate values {}",
                        describe_value(foreign),
                        describe_values(&input)
                    ),
                ));
            }

            let survivors: Vec<&Variant> = remaining
                .iter()
                .zip(&values)
                .filter(|(_, value)| preferred.contains(*value))
                .map(|(variant, _)| *variant)
                .collect();

            if survivors.is_empty() {
                return Err(SelectionFailure::internal_invariant(
                    self.docs,
                    Some(component.id()),
                    Some(attribute.name().as_str()),
                    rule.name(),
                    format!(
                        "eliminated every candidate from {}",
                        describe_values(&input)
                    ),
                ));
            }

            if survivors.len() < remaining.len() {
                tracing::trace!(
                    "  `{}` ({}) narrowed {} candidate(s) to {}",
                    attribute.name(),
                    rule.name(),
                    remaining.len(),
                    survivors.len()
                );
            }
            remaining = survivors;
        }

        if let [only] = remaining.as_slice() {
            tracing::debug!("  selected {} after disambiguation", only.name());
            return Ok((*only).clone());
        }

        let unresolved = unresolved_attributes(&remaining);
        Err(SelectionFailure::ambiguous_variants(
            self.docs,
            component.id(),
            requested,
            remaining
                .iter()
                .map(|v| AmbiguousCandidate {
                    variant: v.name().to_string(),
                    attributes: attribute_table(v.attributes()),
                })
                .collect(),
            unresolved,
        ))
    }
}

/// A candidate's value for `attribute`, coerced to its type when possible.
fn candidate_value(attributes: &AttributeContainer, attribute: &Attribute) -> Option<AttributeValue> {
    attributes
        .get(attribute)
        .map(|value| value.unwrap_or_else(|raw| raw))
}

/// Attributes whose values (including absence) differ between `variants`.
fn unresolved_attributes(variants: &[&Variant]) -> Vec<String> {
    let names: BTreeSet<InternedString> = variants
        .iter()
        .flat_map(|v| v.attributes().names())
        .collect();

    names
        .into_iter()
        .filter(|name| {
            let values: BTreeSet<Option<AttributeValue>> = variants
                .iter()
                .map(|v| v.attributes().get_raw(name))
                .collect();
            values.len() > 1
        })
        .map(|name| name.to_string())
        .collect()
}

fn describe_value(value: &Option<AttributeValue>) -> String {
    match value {
        Some(value) => format!("`{}`", value),
        None => "<unspecified>".to_string(),
    }
}

fn describe_values(values: &CandidateValues) -> String {
    let parts: Vec<String> = values.iter().map(describe_value).collect();
    format!("[{}]", parts.join(", "))
}
