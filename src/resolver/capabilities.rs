//! Capability conflict resolution.
//!
//! Runs once, after every edge of the graph has been resolved. Selected
//! variants are grouped by capability `(group, name)`; a group provided by
//! more than one variant is a conflict. Each conflict is handed to the rule
//! registered for its capability, which keeps exactly one variant or
//! rejects. Conflicts without a rule, and rejected ones, are reported
//! together as a single [`FailureKind::CapabilitiesConflict`].
//!
//! The resolver never mutates the graph; it returns the decision as a
//! [`CapabilityOutcome`].
//!
//! [`FailureKind::CapabilitiesConflict`]: crate::resolver::FailureKind::CapabilitiesConflict

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::core::{Capability, CapabilityId, ModuleId, Variant};
use crate::resolver::errors::{
    CapabilityConflictDetail, CapabilityRejection, ConflictingVariant, SelectionFailure,
};
use crate::resolver::version::compare_versions;
use crate::util::docs::DocumentationRegistry;
use crate::util::InternedString;

/// Signature of a custom capability resolution rule.
pub type CapabilityResolveFn =
    dyn Fn(&CapabilityConflict) -> Result<Variant, CapabilityRejection> + Send + Sync;

/// A variant taking part in a conflict, with the capability it declares.
#[derive(Debug, Clone)]
pub struct ConflictCandidate {
    pub variant: Variant,
    pub capability: Capability,
}

/// Every selected variant providing one capability.
#[derive(Debug, Clone)]
pub struct CapabilityConflict {
    capability: CapabilityId,
    candidates: Vec<ConflictCandidate>,
}

impl CapabilityConflict {
    pub fn capability(&self) -> CapabilityId {
        self.capability
    }

    /// Candidates in selection order.
    pub fn candidates(&self) -> &[ConflictCandidate] {
        &self.candidates
    }

    pub fn variants(&self) -> impl Iterator<Item = &Variant> + '_ {
        self.candidates.iter().map(|c| &c.variant)
    }

    fn contains(&self, variant: &Variant) -> bool {
        self.variants().any(|v| v == variant)
    }

    fn detail(&self, rejection: Option<&CapabilityRejection>) -> CapabilityConflictDetail {
        CapabilityConflictDetail {
            capability: self.capability.to_string(),
            variants: self
                .candidates
                .iter()
                .map(|c| ConflictingVariant {
                    component: c.variant.owner().to_string(),
                    variant: c.variant.name().to_string(),
                    version: c.capability.version().to_string(),
                })
                .collect(),
            rejection: rejection.map(|r| r.reason.clone()),
        }
    }
}

/// How a conflict on one capability is arbitrated.
#[derive(Clone)]
pub enum CapabilityResolution {
    /// Keep the variant declaring the highest capability version.
    SelectHighestVersion,
    /// Keep the variant owned by this module.
    PreferComponent(ModuleId),
    /// Refuse to arbitrate.
    Reject(String),
    Custom {
        name: InternedString,
        resolve: Arc<CapabilityResolveFn>,
    },
}

impl CapabilityResolution {
    pub fn custom<F>(name: impl Into<InternedString>, resolve: F) -> Self
    where
        F: Fn(&CapabilityConflict) -> Result<Variant, CapabilityRejection> + Send + Sync + 'static,
    {
        CapabilityResolution::Custom {
            name: name.into(),
            resolve: Arc::new(resolve),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CapabilityResolution::SelectHighestVersion => "select-highest-version",
            CapabilityResolution::PreferComponent(_) => "prefer-component",
            CapabilityResolution::Reject(_) => "reject",
            CapabilityResolution::Custom { name, .. } => name.as_str(),
        }
    }

    pub fn apply(&self, conflict: &CapabilityConflict) -> Result<Variant, CapabilityRejection> {
        match self {
            CapabilityResolution::SelectHighestVersion => {
                let mut best: Option<&ConflictCandidate> = None;
                for candidate in conflict.candidates() {
                    let better = match best {
                        None => true,
                        Some(current) => {
                            compare_versions(
                                &candidate.capability.version(),
                                &current.capability.version(),
                            )
                            .is_gt()
                        }
                    };
                    if better {
                        best = Some(candidate);
                    }
                }
                best.map(|c| c.variant.clone()).ok_or_else(|| {
                    CapabilityRejection::new(format!(
                        "no variant provides `{}`",
                        conflict.capability()
                    ))
                })
            }
            CapabilityResolution::PreferComponent(module) => conflict
                .variants()
                .find(|v| v.owner().module_id() == *module)
                .cloned()
                .ok_or_else(|| {
                    CapabilityRejection::new(format!(
                        "none of the conflicting variants is owned by `{}`",
                        module
                    ))
                }),
            CapabilityResolution::Reject(reason) => Err(CapabilityRejection::new(reason.clone())),
            CapabilityResolution::Custom { resolve, .. } => resolve(conflict),
        }
    }
}

impl fmt::Debug for CapabilityResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityResolution::PreferComponent(module) => {
                write!(f, "PreferComponent({})", module)
            }
            CapabilityResolution::Reject(reason) => write!(f, "Reject({:?})", reason),
            CapabilityResolution::Custom { name, .. } => write!(f, "Custom({})", name),
            CapabilityResolution::SelectHighestVersion => f.write_str("SelectHighestVersion"),
        }
    }
}

/// Resolution rules keyed by capability.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRules {
    rules: BTreeMap<CapabilityId, CapabilityResolution>,
}

impl CapabilityRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the rule for `capability`, replacing any previous one.
    pub fn register(
        &mut self,
        capability: CapabilityId,
        resolution: CapabilityResolution,
    ) -> &mut Self {
        if let Some(previous) = self.rules.insert(capability, resolution) {
            tracing::warn!(
                "capability rule `{}` for `{}` was replaced",
                previous.name(),
                capability
            );
        }
        self
    }

    pub fn get(&self, capability: &CapabilityId) -> Option<&CapabilityResolution> {
        self.rules.get(capability)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CapabilityId, &CapabilityResolution)> + '_ {
        self.rules.iter()
    }
}

/// What the resolver decided. Both lists follow selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityOutcome {
    pub kept: Vec<Variant>,
    pub excluded: Vec<Variant>,
}

impl CapabilityOutcome {
    pub fn is_excluded(&self, variant: &Variant) -> bool {
        self.excluded.contains(variant)
    }
}

/// Arbitrates capability conflicts between selected variants.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityConflictResolver<'a> {
    rules: &'a CapabilityRules,
    docs: &'a DocumentationRegistry,
}

impl<'a> CapabilityConflictResolver<'a> {
    pub fn new(rules: &'a CapabilityRules, docs: &'a DocumentationRegistry) -> Self {
        CapabilityConflictResolver { rules, docs }
    }

    pub fn resolve(&self, selected: &[Variant]) -> Result<CapabilityOutcome, SelectionFailure> {
        let mut seen = HashSet::new();
        let unique: Vec<&Variant> = selected.iter().filter(|v| seen.insert(*v)).collect();

        let conflicts = group_by_capability(&unique);
        tracing::debug!(
            "checking capabilities of {} selected variant(s): {} potential conflict(s)",
            unique.len(),
            conflicts.len()
        );

        // Winners later excluded by another conflict are dropped for good and
        // every conflict is arbitrated again without them.
        let mut dropped: HashSet<Variant> = HashSet::new();
        let pass = loop {
            let pass = self.arbitrate(&conflicts, &dropped)?;
            let overturned: Vec<Variant> = pass
                .winners
                .iter()
                .filter(|w| pass.excluded.contains(*w))
                .cloned()
                .collect();
            if overturned.is_empty() {
                break pass;
            }
            for winner in overturned {
                tracing::debug!(
                    "  {} was kept for one capability but excluded for another; arbitrating again",
                    winner.display_name()
                );
                dropped.insert(winner);
            }
        };

        let mut unresolved = pass.unresolved;
        let mut first_rejection = pass.first_rejection;

        for conflict in &conflicts {
            if conflict.variants().all(|v| pass.excluded.contains(v)) {
                let rejection = CapabilityRejection::new(format!(
                    "every provider of `{}` was excluded by another capability conflict",
                    conflict.capability
                ));
                unresolved.push(conflict.detail(Some(&rejection)));
                first_rejection.get_or_insert(rejection);
            }
        }

        if !unresolved.is_empty() {
            return Err(SelectionFailure::capabilities_conflict(
                self.docs,
                unresolved,
                first_rejection,
            ));
        }

        let (excluded, kept): (Vec<&Variant>, Vec<&Variant>) =
            unique.into_iter().partition(|v| pass.excluded.contains(*v));
        Ok(CapabilityOutcome {
            kept: kept.into_iter().cloned().collect(),
            excluded: excluded.into_iter().cloned().collect(),
        })
    }

    /// One pass over every conflict, with `dropped` variants already out.
    fn arbitrate(
        &self,
        conflicts: &[CapabilityConflict],
        dropped: &HashSet<Variant>,
    ) -> Result<Pass, SelectionFailure> {
        let mut pass = Pass {
            excluded: dropped.clone(),
            ..Pass::default()
        };

        for conflict in conflicts {
            let conflict = CapabilityConflict {
                capability: conflict.capability,
                candidates: conflict
                    .candidates
                    .iter()
                    .filter(|c| !pass.excluded.contains(&c.variant))
                    .cloned()
                    .collect(),
            };
            if conflict.candidates.len() < 2 {
                continue;
            }

            let Some(rule) = self.rules.get(&conflict.capability) else {
                tracing::debug!("  no rule for conflicting capability `{}`", conflict.capability);
                pass.unresolved.push(conflict.detail(None));
                continue;
            };

            match rule.apply(&conflict) {
                Ok(winner) => {
                    if !conflict.contains(&winner) {
                        return Err(SelectionFailure::internal_invariant(
                            self.docs,
                            None,
                            None,
                            rule.name(),
                            format!(
                                "kept `{}` which does not take part in the conflict on `{}`",
                                winner.display_name(),
                                conflict.capability
                            ),
                        ));
                    }
                    tracing::debug!(
                        "  `{}`: {} kept {}",
                        conflict.capability,
                        rule.name(),
                        winner.display_name()
                    );
                    for loser in conflict.variants().filter(|v| **v != winner) {
                        pass.excluded.insert(loser.clone());
                    }
                    pass.winners.push(winner);
                }
                Err(rejection) => {
                    tracing::debug!(
                        "  `{}`: {} rejected: {}",
                        conflict.capability,
                        rule.name(),
                        rejection
                    );
                    pass.unresolved.push(conflict.detail(Some(&rejection)));
                    pass.first_rejection.get_or_insert(rejection);
                }
            }
        }

        Ok(pass)
    }
}

#[derive(Default)]
struct Pass {
    excluded: HashSet<Variant>,
    winners: Vec<Variant>,
    unresolved: Vec<CapabilityConflictDetail>,
    first_rejection: Option<CapabilityRejection>,
}

/// Groups with more than one variant, in order of first appearance.
fn group_by_capability(variants: &[&Variant]) -> Vec<CapabilityConflict> {
    let mut index: BTreeMap<CapabilityId, usize> = BTreeMap::new();
    let mut groups: Vec<CapabilityConflict> = Vec::new();

    for variant in variants {
        for capability in variant.capabilities() {
            let id = capability.id();
            let slot = *index.entry(id).or_insert_with(|| {
                groups.push(CapabilityConflict {
                    capability: id,
                    candidates: Vec::new(),
                });
                groups.len() - 1
            });
            let group = &mut groups[slot];
            if !group.contains(variant) {
                group.candidates.push(ConflictCandidate {
                    variant: (*variant).clone(),
                    capability: *capability,
                });
            }
        }
    }

    groups.retain(|g| g.candidates.len() > 1);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::VariantDecl;
    use crate::resolver::{FailureDetail, FailureKind};
    use crate::test_support::{capability, component};

    fn docs() -> DocumentationRegistry {
        DocumentationRegistry::default()
    }

    fn first_variant(notation: &str, decl: VariantDecl) -> Variant {
        component(notation, vec![decl]).variants()[0].clone()
    }

    /// `com.example:lib` at 1.0 (implicit) and 1.1 (declared by a fork).
    fn lib_and_fork() -> (Variant, Variant) {
        let lib = first_variant("com.example:lib:1.0", VariantDecl::new("runtime"));
        let fork = first_variant(
            "org.fork:lib-fork:3.0",
            VariantDecl::new("runtime").with_capability(capability("com.example:lib:1.1")),
        );
        (lib, fork)
    }

    #[test]
    fn test_conflict_without_rule() {
        let (lib, fork) = lib_and_fork();
        let rules = CapabilityRules::new();
        let docs = docs();

        let failure = CapabilityConflictResolver::new(&rules, &docs)
            .resolve(&[lib, fork])
            .unwrap_err();

        assert_eq!(failure.kind(), FailureKind::CapabilitiesConflict);
        let FailureDetail::CapabilitiesConflict { conflicts } = failure.detail() else {
            panic!("unexpected detail: {:?}", failure.detail());
        };
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].capability, "com.example:lib");
        let owners: Vec<(&str, &str)> = conflicts[0]
            .variants
            .iter()
            .map(|v| (v.component.as_str(), v.version.as_str()))
            .collect();
        assert_eq!(
            owners,
            vec![("com.example:lib:1.0", "1.0"), ("org.fork:lib-fork:3.0", "1.1")]
        );
        assert!(failure.resolutions().len() >= 3);
    }

    #[test]
    fn test_highest_version_rule() {
        let (lib, fork) = lib_and_fork();
        let mut rules = CapabilityRules::new();
        rules.register(
            CapabilityId::new("com.example", "lib"),
            CapabilityResolution::SelectHighestVersion,
        );
        let docs = docs();

        let outcome = CapabilityConflictResolver::new(&rules, &docs)
            .resolve(&[lib.clone(), fork.clone()])
            .unwrap();

        assert_eq!(outcome.kept, vec![fork]);
        assert_eq!(outcome.excluded, vec![lib.clone()]);
        assert!(outcome.is_excluded(&lib));
    }

    #[test]
    fn test_highest_version_tie_keeps_first() {
        let a = first_variant(
            "org.a:a:1.0",
            VariantDecl::new("runtime").with_capability(capability("com.example:api:2.0")),
        );
        let b = first_variant(
            "org.b:b:1.0",
            VariantDecl::new("runtime").with_capability(capability("com.example:api:2.0.0")),
        );
        let mut rules = CapabilityRules::new();
        rules.register(
            CapabilityId::new("com.example", "api"),
            CapabilityResolution::SelectHighestVersion,
        );
        let docs = docs();

        let outcome = CapabilityConflictResolver::new(&rules, &docs)
            .resolve(&[a.clone(), b.clone()])
            .unwrap();
        assert_eq!(outcome.kept, vec![a]);
        assert_eq!(outcome.excluded, vec![b]);
    }

    #[test]
    fn test_distinct_capabilities_do_not_conflict() {
        let lib = first_variant("com.example:lib:1.0", VariantDecl::new("runtime"));
        let other = first_variant("com.example:other:1.0", VariantDecl::new("runtime"));
        let rules = CapabilityRules::new();
        let docs = docs();

        let outcome = CapabilityConflictResolver::new(&rules, &docs)
            .resolve(&[lib.clone(), other.clone(), lib.clone()])
            .unwrap();

        assert_eq!(outcome.kept, vec![lib, other]);
        assert!(outcome.excluded.is_empty());
    }

    #[test]
    fn test_same_name_in_other_group_does_not_conflict() {
        let lib = first_variant("com.example:lib:1.0", VariantDecl::new("runtime"));
        let other = first_variant("org.other:lib:1.0", VariantDecl::new("runtime"));
        let rules = CapabilityRules::new();
        let docs = docs();

        let outcome = CapabilityConflictResolver::new(&rules, &docs)
            .resolve(&[lib.clone(), other.clone()])
            .unwrap();

        assert_eq!(outcome.kept, vec![lib, other]);
        assert!(outcome.excluded.is_empty());
    }

    fn providing(notation: &str, capabilities: &[&str]) -> Variant {
        let decl = capabilities
            .iter()
            .fold(VariantDecl::new("runtime"), |decl, c| {
                decl.with_capability(capability(c))
            });
        first_variant(notation, decl)
    }

    fn prefer(rules: &mut CapabilityRules, capability: &str, module: &str) {
        rules.register(
            capability.parse().unwrap(),
            CapabilityResolution::PreferComponent(module.parse().unwrap()),
        );
    }

    #[test]
    fn test_winner_excluded_by_later_conflict_is_rearbitrated() {
        // `a` wins `x` but loses `y`; `b` must then provide `x`.
        let a = providing("org.a:a:1.0", &["com.example:x:1.0", "com.example:y:1.0"]);
        let b = providing("org.b:b:1.0", &["com.example:x:1.0"]);
        let c = providing("org.c:c:1.0", &["com.example:y:1.0"]);
        let mut rules = CapabilityRules::new();
        prefer(&mut rules, "com.example:x", "org.a:a");
        prefer(&mut rules, "com.example:y", "org.c:c");
        let docs = docs();

        let outcome = CapabilityConflictResolver::new(&rules, &docs)
            .resolve(&[a.clone(), b.clone(), c.clone()])
            .unwrap();

        assert_eq!(outcome.kept, vec![b, c]);
        assert_eq!(outcome.excluded, vec![a]);
        for id in ["com.example:x", "com.example:y"] {
            let id: CapabilityId = id.parse().unwrap();
            let providers = outcome
                .kept
                .iter()
                .filter(|v| v.capabilities().iter().any(|c| c.id() == id))
                .count();
            assert_eq!(providers, 1, "`{}` must keep exactly one provider", id);
        }
    }

    #[test]
    fn test_capability_left_without_provider_fails() {
        let a = providing("org.a:a:1.0", &["com.example:x:1.0", "com.example:z:1.0"]);
        let b = providing("org.b:b:1.0", &["com.example:x:1.0", "com.example:y:1.0"]);
        let c = providing("org.c:c:1.0", &["com.example:y:1.0", "com.example:z:1.0"]);
        let mut rules = CapabilityRules::new();
        prefer(&mut rules, "com.example:x", "org.a:a");
        prefer(&mut rules, "com.example:y", "org.b:b");
        prefer(&mut rules, "com.example:z", "org.c:c");
        let docs = docs();

        let failure = CapabilityConflictResolver::new(&rules, &docs)
            .resolve(&[a, b, c])
            .unwrap_err();

        assert_eq!(failure.kind(), FailureKind::CapabilitiesConflict);
        let FailureDetail::CapabilitiesConflict { conflicts } = failure.detail() else {
            panic!("unexpected detail: {:?}", failure.detail());
        };
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].capability, "com.example:z");
        assert!(conflicts[0]
            .rejection
            .as_deref()
            .unwrap()
            .contains("excluded by another capability conflict"));
    }

    #[test]
    fn test_prefer_component_and_reject() {
        let (lib, fork) = lib_and_fork();
        let docs = docs();
        let id = CapabilityId::new("com.example", "lib");

        let mut rules = CapabilityRules::new();
        rules.register(
            id,
            CapabilityResolution::PreferComponent(ModuleId::new("com.example", "lib")),
        );
        let outcome = CapabilityConflictResolver::new(&rules, &docs)
            .resolve(&[fork.clone(), lib.clone()])
            .unwrap();
        assert_eq!(outcome.kept, vec![lib.clone()]);

        rules.register(id, CapabilityResolution::Reject("forks are not allowed".into()));
        let failure = CapabilityConflictResolver::new(&rules, &docs)
            .resolve(&[fork, lib])
            .unwrap_err();
        assert_eq!(failure.kind(), FailureKind::CapabilitiesConflict);
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["cause"], "forks are not allowed");
        assert_eq!(
            json["detail"]["conflicts"][0]["rejection"],
            "forks are not allowed"
        );
    }

    #[test]
    fn test_rule_keeping_foreign_variant_is_invariant_violation() {
        let (lib, fork) = lib_and_fork();
        let stranger = first_variant("org.other:stranger:1.0", VariantDecl::new("runtime"));
        let mut rules = CapabilityRules::new();
        rules.register(
            CapabilityId::new("com.example", "lib"),
            CapabilityResolution::custom("stranger", move |_| Ok(stranger.clone())),
        );
        let docs = docs();

        let failure = CapabilityConflictResolver::new(&rules, &docs)
            .resolve(&[lib, fork])
            .unwrap_err();
        assert_eq!(failure.kind(), FailureKind::InternalSelectionInvariant);
    }

    #[test]
    fn test_excluded_variant_leaves_later_groups() {
        // `fork` provides both `lib` and `extras`; once it loses `lib`, the
        // `extras` group has a single provider left.
        let lib = first_variant("com.example:lib:1.0", VariantDecl::new("runtime"));
        let extras = first_variant("com.example:extras:1.0", VariantDecl::new("runtime"));
        let fork = first_variant(
            "org.fork:lib-fork:3.0",
            VariantDecl::new("runtime")
                .with_capability(capability("com.example:lib:0.9"))
                .with_capability(capability("com.example:extras:0.9")),
        );
        let mut rules = CapabilityRules::new();
        rules.register(
            CapabilityId::new("com.example", "lib"),
            CapabilityResolution::SelectHighestVersion,
        );
        let docs = docs();

        let outcome = CapabilityConflictResolver::new(&rules, &docs)
            .resolve(&[lib.clone(), fork.clone(), extras.clone()])
            .unwrap();
        assert_eq!(outcome.kept, vec![lib, extras]);
        assert_eq!(outcome.excluded, vec![fork]);
    }

    #[test]
    fn test_all_unresolved_conflicts_reported_together() {
        let a1 = first_variant("com.example:a:1.0", VariantDecl::new("runtime"));
        let a2 = first_variant(
            "org.fork:a:1.0",
            VariantDecl::new("runtime").with_capability(capability("com.example:a:2.0")),
        );
        let b1 = first_variant("com.example:b:1.0", VariantDecl::new("runtime"));
        let b2 = first_variant(
            "org.fork:b:1.0",
            VariantDecl::new("runtime").with_capability(capability("com.example:b")),
        );
        let rules = CapabilityRules::new();
        let docs = docs();

        let failure = CapabilityConflictResolver::new(&rules, &docs)
            .resolve(&[a1, b1, a2, b2])
            .unwrap_err();
        let FailureDetail::CapabilitiesConflict { conflicts } = failure.detail() else {
            panic!("unexpected detail: {:?}", failure.detail());
        };
        let names: Vec<&str> = conflicts.iter().map(|c| c.capability.as_str()).collect();
        assert_eq!(names, vec!["com.example:a", "com.example:b"]);
        assert_eq!(conflicts[1].variants[1].version, "unspecified");
    }
}
