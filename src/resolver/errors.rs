//! Selection failures and their diagnostics.
//!
//! Every failure produced by the selector or the capability resolver is a
//! [`SelectionFailure`]: a summary, an ordered list of resolutions (the first
//! one always points at the variant matching documentation) and a structured
//! [`FailureDetail`] that reporting layers can render without re-deriving
//! anything. Failures are built in one step and never mutated afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::core::{AttributeContainer, ComponentId};
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::docs::DocumentationRegistry;

/// Prefix of the resolution every failure carries.
pub const DEFAULT_RESOLUTION_PREFIX: &str = "Review the variant matching algorithm at ";

/// An attribute table rendered for diagnostics: name -> value.
pub type AttributeTable = BTreeMap<String, String>;

pub(crate) fn attribute_table(attributes: &AttributeContainer) -> AttributeTable {
    attributes
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// The concrete kind of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    NoCompatibleVariants,
    AmbiguousVariants,
    CapabilitiesConflict,
    InternalSelectionInvariant,
    ConfigurationNotFound,
}

impl FailureKind {
    pub fn code(&self) -> &'static str {
        match self {
            FailureKind::NoCompatibleVariants => "quay::select::no_compatible_variants",
            FailureKind::AmbiguousVariants => "quay::select::ambiguous_variants",
            FailureKind::CapabilitiesConflict => "quay::select::capabilities_conflict",
            FailureKind::InternalSelectionInvariant => "quay::select::internal_invariant",
            FailureKind::ConfigurationNotFound => "quay::select::configuration_not_found",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Why a candidate was filtered out: the first incompatible attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedCandidate {
    pub variant: String,
    pub attribute: String,
    pub requested: String,
    pub provided: String,
    pub attributes: AttributeTable,
}

/// A candidate still in play when disambiguation ran out of attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousCandidate {
    pub variant: String,
    pub attributes: AttributeTable,
}

/// One variant taking part in a capability conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictingVariant {
    pub component: String,
    pub variant: String,
    pub version: String,
}

/// All variants providing one capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityConflictDetail {
    pub capability: String,
    pub variants: Vec<ConflictingVariant>,
    /// Set when a configured rule explicitly rejected the conflict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<String>,
}

/// Structured payload of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FailureDetail {
    NoCompatibleVariants {
        component: String,
        requested: AttributeTable,
        candidates: Vec<RejectedCandidate>,
    },
    AmbiguousVariants {
        component: String,
        requested: AttributeTable,
        candidates: Vec<AmbiguousCandidate>,
        /// Attributes whose values still differ between the candidates.
        unresolved_attributes: Vec<String>,
    },
    CapabilitiesConflict {
        conflicts: Vec<CapabilityConflictDetail>,
    },
    InternalSelectionInvariant {
        #[serde(skip_serializing_if = "Option::is_none")]
        component: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        attribute: Option<String>,
        rule: String,
        violation: String,
    },
    ConfigurationNotFound {
        component: String,
        configuration: String,
        available: Vec<String>,
    },
}

impl FailureDetail {
    pub fn kind(&self) -> FailureKind {
        match self {
            FailureDetail::NoCompatibleVariants { .. } => FailureKind::NoCompatibleVariants,
            FailureDetail::AmbiguousVariants { .. } => FailureKind::AmbiguousVariants,
            FailureDetail::CapabilitiesConflict { .. } => FailureKind::CapabilitiesConflict,
            FailureDetail::InternalSelectionInvariant { .. } => {
                FailureKind::InternalSelectionInvariant
            }
            FailureDetail::ConfigurationNotFound { .. } => FailureKind::ConfigurationNotFound,
        }
    }
}

/// Error a capability resolution rule returns to refuse arbitrating.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct CapabilityRejection {
    pub reason: String,
}

impl CapabilityRejection {
    pub fn new(reason: impl Into<String>) -> Self {
        CapabilityRejection {
            reason: reason.into(),
        }
    }
}

type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// A variant selection or capability arbitration failure.
#[derive(Debug, Clone, Error)]
#[error("{summary}")]
pub struct SelectionFailure {
    summary: String,
    resolutions: Vec<String>,
    detail: FailureDetail,
    #[source]
    cause: Option<Cause>,
}

impl SelectionFailure {
    fn new(
        docs: &DocumentationRegistry,
        summary: String,
        detail: FailureDetail,
        extra_resolutions: &[&str],
        cause: Option<Cause>,
    ) -> Self {
        let mut resolutions = Vec::with_capacity(1 + extra_resolutions.len());
        resolutions.push(format!(
            "{}{}.",
            DEFAULT_RESOLUTION_PREFIX,
            docs.variant_matching()
        ));
        resolutions.extend(extra_resolutions.iter().map(|r| r.to_string()));

        SelectionFailure {
            summary,
            resolutions,
            detail,
            cause,
        }
    }

    pub fn no_compatible_variants(
        docs: &DocumentationRegistry,
        component: &ComponentId,
        requested: &AttributeContainer,
        candidates: Vec<RejectedCandidate>,
    ) -> Self {
        let summary = if candidates.is_empty() {
            format!("no matching variant of `{}` was found: it publishes no variants", component)
        } else {
            format!(
                "no matching variant of `{}` was found for the request {}",
                component, requested
            )
        };

        Self::new(
            docs,
            summary,
            FailureDetail::NoCompatibleVariants {
                component: component.to_string(),
                requested: attribute_table(requested),
                candidates,
            },
            &[],
            None,
        )
    }

    pub fn ambiguous_variants(
        docs: &DocumentationRegistry,
        component: &ComponentId,
        requested: &AttributeContainer,
        candidates: Vec<AmbiguousCandidate>,
        unresolved_attributes: Vec<String>,
    ) -> Self {
        let summary = format!(
            "cannot choose between the {} variants of `{}` that match the request {}",
            candidates.len(),
            component,
            requested
        );

        Self::new(
            docs,
            summary,
            FailureDetail::AmbiguousVariants {
                component: component.to_string(),
                requested: attribute_table(requested),
                candidates,
                unresolved_attributes,
            },
            &[
                suggestions::ADD_ATTRIBUTES,
                suggestions::ADD_DISAMBIGUATION_RULE,
            ],
            None,
        )
    }

    pub fn capabilities_conflict(
        docs: &DocumentationRegistry,
        conflicts: Vec<CapabilityConflictDetail>,
        cause: Option<CapabilityRejection>,
    ) -> Self {
        let summary = match conflicts.as_slice() {
            [single] => format!(
                "capability conflict: `{}` is provided by {} variants",
                single.capability,
                single.variants.len()
            ),
            many => format!("found {} capability conflicts", many.len()),
        };

        let mut seen = BTreeSet::new();
        let components: Vec<&str> = conflicts
            .iter()
            .flat_map(|c| c.variants.iter().map(|v| v.component.as_str()))
            .filter(|component| seen.insert(*component))
            .collect();
        let exclude = format!(
            "Exclude one of the conflicting components from the graph: {}",
            components.join(", ")
        );

        Self::new(
            docs,
            summary,
            FailureDetail::CapabilitiesConflict { conflicts },
            &[suggestions::ADD_CAPABILITY_RULE, exclude.as_str()],
            cause.map(|c| Arc::new(c) as Cause),
        )
    }

    pub fn internal_invariant(
        docs: &DocumentationRegistry,
        component: Option<&ComponentId>,
        attribute: Option<&str>,
        rule: &str,
        violation: impl Into<String>,
    ) -> Self {
        let violation = violation.into();
        let summary = match attribute {
            Some(attribute) => format!(
                "internal error: rule `{}` for attribute `{}` {}",
                rule, attribute, violation
            ),
            None => format!("internal error: rule `{}` {}", rule, violation),
        };

        let failure = Self::new(
            docs,
            summary,
            FailureDetail::InternalSelectionInvariant {
                component: component.map(|c| c.to_string()),
                attribute: attribute.map(str::to_string),
                rule: rule.to_string(),
                violation,
            },
            &[suggestions::REPORT_RULE_BUG],
            None,
        );
        tracing::error!("{}", failure.summary);
        failure
    }

    pub fn configuration_not_found(
        docs: &DocumentationRegistry,
        component: &ComponentId,
        configuration: &str,
        available: Vec<String>,
    ) -> Self {
        let summary = format!(
            "`{}` has no configuration or variant named `{}`",
            component, configuration
        );

        Self::new(
            docs,
            summary,
            FailureDetail::ConfigurationNotFound {
                component: component.to_string(),
                configuration: configuration.to_string(),
                available,
            },
            &["Select the variant through attributes instead of by name"],
            None,
        )
    }

    pub fn kind(&self) -> FailureKind {
        self.detail.kind()
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Suggested resolutions; never empty.
    pub fn resolutions(&self) -> &[String] {
        &self.resolutions
    }

    pub fn detail(&self) -> &FailureDetail {
        &self.detail
    }

    /// Broken rule implementations are never user-recoverable.
    pub fn is_fatal(&self) -> bool {
        self.kind() == FailureKind::InternalSelectionInvariant
    }

    /// Convert to a terminal diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(&self.summary);

        match &self.detail {
            FailureDetail::NoCompatibleVariants { candidates, .. } => {
                for candidate in candidates {
                    diag = diag.with_context(format!(
                        "variant `{}` is incompatible: it provides {}=`{}` but `{}` was requested",
                        candidate.variant, candidate.attribute, candidate.provided, candidate.requested
                    ));
                }
            }
            FailureDetail::AmbiguousVariants {
                candidates,
                unresolved_attributes,
                ..
            } => {
                for candidate in candidates {
                    diag = diag.with_context(format!(
                        "variant `{}` {}",
                        candidate.variant,
                        render_table(&candidate.attributes)
                    ));
                }
                if !unresolved_attributes.is_empty() {
                    diag = diag.with_context(format!(
                        "no rule could choose between values of: {}",
                        unresolved_attributes.join(", ")
                    ));
                }
            }
            FailureDetail::CapabilitiesConflict { conflicts } => {
                for conflict in conflicts {
                    for variant in &conflict.variants {
                        diag = diag.with_context(format!(
                            "`{}` provided by `{}` (variant `{}`) at version {}",
                            conflict.capability, variant.component, variant.variant, variant.version
                        ));
                    }
                    if let Some(rejection) = &conflict.rejection {
                        diag = diag.with_context(format!(
                            "resolution rule for `{}` rejected the conflict: {}",
                            conflict.capability, rejection
                        ));
                    }
                }
            }
            FailureDetail::InternalSelectionInvariant { component, .. } => {
                if let Some(component) = component {
                    diag = diag.with_context(format!("while selecting a variant of `{}`", component));
                }
            }
            FailureDetail::ConfigurationNotFound { available, .. } => {
                diag = diag.with_context(format!("available: {}", available.join(", ")));
            }
        }

        for resolution in &self.resolutions {
            diag = diag.with_suggestion(resolution.clone());
        }

        diag
    }
}

fn render_table(table: &AttributeTable) -> String {
    let parts: Vec<String> = table.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{{{}}}", parts.join(", "))
}

impl Serialize for SelectionFailure {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        struct FailureData<'a> {
            code: &'static str,
            summary: &'a str,
            resolutions: &'a [String],
            detail: &'a FailureDetail,
            #[serde(skip_serializing_if = "Option::is_none")]
            cause: Option<String>,
        }

        FailureData {
            code: self.kind().code(),
            summary: &self.summary,
            resolutions: &self.resolutions,
            detail: &self.detail,
            cause: self.cause.as_ref().map(|c| c.to_string()),
        }
        .serialize(serializer)
    }
}

impl miette::Diagnostic for SelectionFailure {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind().code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.resolutions.join("\n")))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ModuleCoordinates;

    fn lib() -> ComponentId {
        ComponentId::module(ModuleCoordinates::new("com.example", "lib", "1.0"))
    }

    #[test]
    fn test_default_resolution_always_first() {
        let docs = DocumentationRegistry::new("https://docs.example.com/userguide").unwrap();
        let failure = SelectionFailure::ambiguous_variants(
            &docs,
            &lib(),
            &AttributeContainer::empty(),
            vec![],
            vec![],
        );

        assert_eq!(
            failure.resolutions()[0],
            "Review the variant matching algorithm at \
             https://docs.example.com/userguide/variant_attributes#sec:abm_algorithm."
        );
        assert_eq!(failure.resolutions().len(), 3);
    }

    #[test]
    fn test_capability_conflict_diagnostic() {
        let docs = DocumentationRegistry::default();
        let failure = SelectionFailure::capabilities_conflict(
            &docs,
            vec![CapabilityConflictDetail {
                capability: "com.example:lib".into(),
                variants: vec![
                    ConflictingVariant {
                        component: "com.example:lib:1.0".into(),
                        variant: "runtimeElements".into(),
                        version: "1.0".into(),
                    },
                    ConflictingVariant {
                        component: "com.fork:lib:1.1".into(),
                        variant: "runtimeElements".into(),
                        version: "1.1".into(),
                    },
                ],
                rejection: None,
            }],
            None,
        );

        let output = failure.to_diagnostic().format(false);
        assert!(output.contains("capability conflict: `com.example:lib` is provided by 2 variants"));
        assert!(output.contains("`com.fork:lib:1.1` (variant `runtimeElements`) at version 1.1"));
        assert!(output.contains("Exclude one of the conflicting components"));
        assert!(!failure.is_fatal());
    }

    #[test]
    fn test_exclude_suggestion_lists_each_component_once() {
        let variant = |component: &str, version: &str| ConflictingVariant {
            component: component.into(),
            variant: "runtime".into(),
            version: version.into(),
        };
        let failure = SelectionFailure::capabilities_conflict(
            &DocumentationRegistry::default(),
            vec![
                CapabilityConflictDetail {
                    capability: "com.example:x".into(),
                    variants: vec![variant("org.a:a:1.0", "1.0"), variant("org.b:b:1.0", "1.0")],
                    rejection: None,
                },
                CapabilityConflictDetail {
                    capability: "com.example:y".into(),
                    variants: vec![variant("org.c:c:1.0", "1.0"), variant("org.a:a:1.0", "1.0")],
                    rejection: None,
                },
            ],
            None,
        );

        let exclude = failure
            .resolutions()
            .iter()
            .find(|r| r.starts_with("Exclude one of the conflicting components"))
            .unwrap();
        assert!(exclude.ends_with(": org.a:a:1.0, org.b:b:1.0, org.c:c:1.0"));
    }

    #[test]
    fn test_internal_invariant_is_fatal_and_distinguishable() {
        let failure = SelectionFailure::internal_invariant(
            &DocumentationRegistry::default(),
            Some(&lib()),
            Some("usage"),
            "broken",
            "returned a value that was not a candidate",
        );

        assert!(failure.is_fatal());
        assert!(failure.summary().starts_with("internal error:"));
        assert_eq!(failure.kind(), FailureKind::InternalSelectionInvariant);
    }

    #[test]
    fn test_serializes_structured_detail() {
        let failure = SelectionFailure::configuration_not_found(
            &DocumentationRegistry::default(),
            &lib(),
            "compile",
            vec!["apiElements".into(), "runtimeElements".into()],
        );

        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["code"], "quay::select::configuration_not_found");
        assert_eq!(json["detail"]["kind"], "configuration-not-found");
        assert_eq!(json["detail"]["available"][1], "runtimeElements");
    }

    #[test]
    fn test_rejection_is_source() {
        use std::error::Error as _;

        let failure = SelectionFailure::capabilities_conflict(
            &DocumentationRegistry::default(),
            vec![],
            Some(CapabilityRejection::new("both forks are unsupported")),
        );

        assert_eq!(
            failure.source().map(|s| s.to_string()),
            Some("both forks are unsupported".to_string())
        );
    }
}
