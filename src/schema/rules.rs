//! Compatibility and disambiguation rules.
//!
//! Rules are plain values: a small closed set of built-ins plus a `Custom`
//! escape hatch wrapping a shared function. Every rule must be pure; the
//! selector relies on that for reproducible results and for sharing a frozen
//! schema between threads.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::core::{AttributeValue, ValueType};
use crate::util::InternedString;

/// Outcome of a compatibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    Compatible,
    Incompatible,
}

impl Compatibility {
    pub fn is_compatible(self) -> bool {
        matches!(self, Compatibility::Compatible)
    }
}

impl From<bool> for Compatibility {
    fn from(compatible: bool) -> Self {
        if compatible {
            Compatibility::Compatible
        } else {
            Compatibility::Incompatible
        }
    }
}

/// Values still in play for one attribute during disambiguation.
///
/// `None` stands for candidates that do not declare the attribute.
pub type CandidateValues = BTreeSet<Option<AttributeValue>>;

pub type CompatibilityFn = dyn Fn(&AttributeValue, &AttributeValue) -> Compatibility + Send + Sync;

pub type DisambiguationFn =
    dyn Fn(Option<&AttributeValue>, &CandidateValues) -> CandidateValues + Send + Sync;

/// Decides whether a candidate value satisfies a requested value.
#[derive(Clone)]
pub enum CompatibilityRule {
    /// Values must be equal.
    Equality,
    /// Integer candidate must be lower than or equal to the request.
    AtMost,
    /// Integer candidate must be greater than or equal to the request.
    AtLeast,
    /// Equality, plus extra candidate values accepted per requested value.
    Accepts(Arc<BTreeMap<AttributeValue, BTreeSet<AttributeValue>>>),
    Custom {
        name: InternedString,
        check: Arc<CompatibilityFn>,
    },
}

impl CompatibilityRule {
    pub fn custom<F>(name: impl Into<InternedString>, check: F) -> Self
    where
        F: Fn(&AttributeValue, &AttributeValue) -> Compatibility + Send + Sync + 'static,
    {
        CompatibilityRule::Custom {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// Build an `Accepts` table from `(requested, accepted candidates)` pairs.
    pub fn accepts<I, V>(table: I) -> Self
    where
        I: IntoIterator<Item = (AttributeValue, V)>,
        V: IntoIterator<Item = AttributeValue>,
    {
        let mut map: BTreeMap<AttributeValue, BTreeSet<AttributeValue>> = BTreeMap::new();
        for (requested, accepted) in table {
            map.entry(requested).or_default().extend(accepted);
        }
        CompatibilityRule::Accepts(Arc::new(map))
    }

    pub fn name(&self) -> &str {
        match self {
            CompatibilityRule::Equality => "equality",
            CompatibilityRule::AtMost => "at-most",
            CompatibilityRule::AtLeast => "at-least",
            CompatibilityRule::Accepts(_) => "accepts",
            CompatibilityRule::Custom { name, .. } => name.as_str(),
        }
    }

    /// Whether this rule can operate on values of `value_type`.
    pub fn applies_to(&self, value_type: ValueType) -> bool {
        match self {
            CompatibilityRule::AtMost | CompatibilityRule::AtLeast => {
                value_type == ValueType::Integer
            }
            CompatibilityRule::Accepts(table) => table
                .iter()
                .flat_map(|(k, vs)| std::iter::once(k).chain(vs.iter()))
                .all(|v| v.value_type() == value_type),
            _ => true,
        }
    }

    pub fn check(&self, requested: &AttributeValue, candidate: &AttributeValue) -> Compatibility {
        match self {
            CompatibilityRule::Equality => (requested == candidate).into(),
            CompatibilityRule::AtMost => match (requested.as_integer(), candidate.as_integer()) {
                (Some(r), Some(c)) => (c <= r).into(),
                _ => Compatibility::Incompatible,
            },
            CompatibilityRule::AtLeast => match (requested.as_integer(), candidate.as_integer()) {
                (Some(r), Some(c)) => (c >= r).into(),
                _ => Compatibility::Incompatible,
            },
            CompatibilityRule::Accepts(table) => {
                let accepted = requested == candidate
                    || table
                        .get(requested)
                        .is_some_and(|accepted| accepted.contains(candidate));
                accepted.into()
            }
            CompatibilityRule::Custom { check, .. } => check(requested, candidate),
        }
    }
}

impl Default for CompatibilityRule {
    fn default() -> Self {
        CompatibilityRule::Equality
    }
}

impl PartialEq for CompatibilityRule {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CompatibilityRule::Equality, CompatibilityRule::Equality)
            | (CompatibilityRule::AtMost, CompatibilityRule::AtMost)
            | (CompatibilityRule::AtLeast, CompatibilityRule::AtLeast) => true,
            (CompatibilityRule::Accepts(a), CompatibilityRule::Accepts(b)) => a == b,
            (
                CompatibilityRule::Custom { name: n1, check: c1 },
                CompatibilityRule::Custom { name: n2, check: c2 },
            ) => n1 == n2 && Arc::ptr_eq(c1, c2),
            _ => false,
        }
    }
}

impl fmt::Debug for CompatibilityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompatibilityRule::Accepts(table) => f.debug_tuple("Accepts").field(table).finish(),
            CompatibilityRule::Custom { name, .. } => write!(f, "Custom({})", name),
            _ => f.write_str(self.name()),
        }
    }
}

/// Narrows the set of candidate values for one attribute.
#[derive(Clone)]
pub enum DisambiguationRule {
    /// Keep everything.
    None,
    /// Keep only the requested value if a candidate has it.
    PreferRequested,
    /// The first listed value present among the candidates wins.
    PreferOrder(Arc<[AttributeValue]>),
    /// Largest integer wins.
    Highest,
    /// Smallest integer wins.
    Lowest,
    /// Integer(s) nearest to the requested value win.
    Closest,
    /// Candidates that do not declare the attribute win.
    PreferUnspecified,
    Custom {
        name: InternedString,
        choose: Arc<DisambiguationFn>,
    },
}

impl DisambiguationRule {
    pub fn custom<F>(name: impl Into<InternedString>, choose: F) -> Self
    where
        F: Fn(Option<&AttributeValue>, &CandidateValues) -> CandidateValues + Send + Sync + 'static,
    {
        DisambiguationRule::Custom {
            name: name.into(),
            choose: Arc::new(choose),
        }
    }

    pub fn prefer_order<I>(order: I) -> Self
    where
        I: IntoIterator<Item = AttributeValue>,
    {
        DisambiguationRule::PreferOrder(order.into_iter().collect())
    }

    pub fn name(&self) -> &str {
        match self {
            DisambiguationRule::None => "none",
            DisambiguationRule::PreferRequested => "prefer-requested",
            DisambiguationRule::PreferOrder(_) => "prefer-order",
            DisambiguationRule::Highest => "highest",
            DisambiguationRule::Lowest => "lowest",
            DisambiguationRule::Closest => "closest",
            DisambiguationRule::PreferUnspecified => "prefer-unspecified",
            DisambiguationRule::Custom { name, .. } => name.as_str(),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, DisambiguationRule::None)
    }

    pub fn applies_to(&self, value_type: ValueType) -> bool {
        match self {
            DisambiguationRule::Highest
            | DisambiguationRule::Lowest
            | DisambiguationRule::Closest => value_type == ValueType::Integer,
            DisambiguationRule::PreferOrder(order) => {
                order.iter().all(|v| v.value_type() == value_type)
            }
            _ => true,
        }
    }

    /// Apply the rule. Built-in rules always return a non-empty subset of a
    /// non-empty input; custom rules are checked by the selector.
    pub fn apply(
        &self,
        requested: Option<&AttributeValue>,
        candidates: &CandidateValues,
    ) -> CandidateValues {
        match self {
            DisambiguationRule::None => candidates.clone(),
            DisambiguationRule::PreferRequested => match requested {
                Some(r) if candidates.contains(&Some(*r)) => single(Some(*r)),
                _ => candidates.clone(),
            },
            DisambiguationRule::PreferOrder(order) => order
                .iter()
                .find(|v| candidates.contains(&Some(**v)))
                .map(|v| single(Some(*v)))
                .unwrap_or_else(|| candidates.clone()),
            DisambiguationRule::Highest => {
                pick_integer(candidates, |values| values.iter().max().copied())
            }
            DisambiguationRule::Lowest => {
                pick_integer(candidates, |values| values.iter().min().copied())
            }
            DisambiguationRule::Closest => {
                let Some(target) = requested.and_then(|r| r.as_integer()) else {
                    return candidates.clone();
                };
                let distance = |v: &AttributeValue| v.as_integer().map(|i| i.abs_diff(target));
                let best = candidates.iter().flatten().filter_map(distance).min();
                match best {
                    Some(best) => candidates
                        .iter()
                        .filter(|v| v.as_ref().and_then(distance) == Some(best))
                        .copied()
                        .collect(),
                    None => candidates.clone(),
                }
            }
            DisambiguationRule::PreferUnspecified => {
                if candidates.contains(&None) {
                    single(None)
                } else {
                    candidates.clone()
                }
            }
            DisambiguationRule::Custom { choose, .. } => choose(requested, candidates),
        }
    }
}

fn single(value: Option<AttributeValue>) -> CandidateValues {
    let mut set = CandidateValues::new();
    set.insert(value);
    set
}

fn pick_integer<F>(candidates: &CandidateValues, pick: F) -> CandidateValues
where
    F: Fn(&[i64]) -> Option<i64>,
{
    let values: Vec<i64> = candidates
        .iter()
        .flatten()
        .filter_map(|v| v.as_integer())
        .collect();
    match pick(&values) {
        Some(i) => single(Some(AttributeValue::Integer(i))),
        None => candidates.clone(),
    }
}

impl Default for DisambiguationRule {
    fn default() -> Self {
        DisambiguationRule::None
    }
}

impl PartialEq for DisambiguationRule {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DisambiguationRule::PreferOrder(a), DisambiguationRule::PreferOrder(b)) => a == b,
            (
                DisambiguationRule::Custom { name: n1, choose: c1 },
                DisambiguationRule::Custom { name: n2, choose: c2 },
            ) => n1 == n2 && Arc::ptr_eq(c1, c2),
            (DisambiguationRule::Custom { .. }, _) | (_, DisambiguationRule::Custom { .. }) => {
                false
            }
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl fmt::Debug for DisambiguationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisambiguationRule::PreferOrder(order) => {
                f.debug_tuple("PreferOrder").field(order).finish()
            }
            DisambiguationRule::Custom { name, .. } => write!(f, "Custom({})", name),
            _ => f.write_str(self.name()),
        }
    }
}
