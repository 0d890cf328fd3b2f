//! Resolution session - drives selection over a whole graph.
//!
//! A session owns the components of one resolution, the consumer's default
//! attributes and a flat list of edges. Resolving it:
//!
//! 1. selects a variant for every edge, in parallel, collecting every failure;
//! 2. runs the capability barrier over all selected variants;
//! 3. rebuilds the graph without excluded variants and walks it from the
//!    root, reporting selections that can no longer be reached as orphaned.
//!
//! The result is an immutable [`ResolvedGraph`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::core::{AttributeContainer, Component, ModuleId, Variant};
use crate::resolver::capabilities::{CapabilityConflictResolver, CapabilityRules};
use crate::resolver::errors::{attribute_table, AttributeTable, SelectionFailure};
use crate::resolver::selector::VariantSelector;
use crate::schema::AttributeSchema;
use crate::util::docs::DocumentationRegistry;
use crate::util::hash::Fingerprint;
use crate::util::InternedString;

/// Where an edge starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeSource {
    /// The consumer being resolved.
    Root,
    /// A variant of a component in the session.
    Variant {
        component: ModuleId,
        variant: InternedString,
    },
}

impl fmt::Display for EdgeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeSource::Root => f.write_str("root"),
            EdgeSource::Variant { component, variant } => write!(f, "{}/{}", component, variant),
        }
    }
}

/// A dependency edge: `from` requests a variant of `target`.
#[derive(Debug, Clone)]
pub struct Edge {
    pub from: EdgeSource,
    pub target: ModuleId,
    /// Attributes requested on this edge; consumer defaults fill the gaps.
    pub request: AttributeContainer,
    /// Select by configuration name instead of attributes.
    pub configuration: Option<InternedString>,
}

impl Edge {
    pub fn new(from: EdgeSource, target: ModuleId) -> Self {
        Edge {
            from,
            target,
            request: AttributeContainer::empty(),
            configuration: None,
        }
    }

    pub fn with_request(mut self, request: AttributeContainer) -> Self {
        self.request = request;
        self
    }

    pub fn with_configuration(mut self, configuration: impl Into<InternedString>) -> Self {
        self.configuration = Some(configuration.into());
        self
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.target)
    }
}

/// Errors in how a session was put together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("module `{module}` is already part of the session")]
    DuplicateComponent { module: String },

    #[error("edge `{edge}` targets `{module}`, which is not part of the session")]
    UnknownComponent { edge: String, module: String },

    #[error("edge `{edge}` starts from unknown variant `{variant}` of `{module}`")]
    UnknownSourceVariant {
        edge: String,
        module: String,
        variant: String,
    },
}

/// One failure, tied to the edge it came from when there is one.
#[derive(Debug, Clone, Serialize)]
pub struct ReportedFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge: Option<String>,
    pub failure: SelectionFailure,
}

/// Every failure of a session, in edge order.
#[derive(Debug, Clone, Error, Serialize)]
#[error("resolution failed with {} error(s)", .failures.len())]
pub struct SessionFailure {
    pub failures: Vec<ReportedFailure>,
}

impl SessionFailure {
    fn single(failure: SelectionFailure) -> Self {
        SessionFailure {
            failures: vec![ReportedFailure {
                edge: None,
                failure,
            }],
        }
    }

    pub fn has_fatal(&self) -> bool {
        self.failures.iter().any(|f| f.failure.is_fatal())
    }
}

/// A set of components and edges to resolve together.
#[derive(Debug)]
pub struct ResolutionSession<'a> {
    schema: &'a AttributeSchema,
    capability_rules: &'a CapabilityRules,
    docs: &'a DocumentationRegistry,
    defaults: AttributeContainer,
    components: BTreeMap<ModuleId, Component>,
    edges: Vec<Edge>,
}

impl<'a> ResolutionSession<'a> {
    pub fn new(
        schema: &'a AttributeSchema,
        capability_rules: &'a CapabilityRules,
        docs: &'a DocumentationRegistry,
    ) -> Self {
        ResolutionSession {
            schema,
            capability_rules,
            docs,
            defaults: AttributeContainer::empty(),
            components: BTreeMap::new(),
            edges: Vec::new(),
        }
    }

    /// Attributes added to every attribute-based request that does not set
    /// them itself.
    pub fn set_defaults(&mut self, defaults: AttributeContainer) -> &mut Self {
        self.defaults = defaults;
        self
    }

    pub fn add_component(&mut self, component: Component) -> Result<&mut Self, SessionError> {
        let module = component.id().module_id();
        if self.components.contains_key(&module) {
            return Err(SessionError::DuplicateComponent {
                module: module.to_string(),
            });
        }
        self.components.insert(module, component);
        Ok(self)
    }

    /// Add an edge. Both ends must already be part of the session.
    pub fn add_edge(&mut self, edge: Edge) -> Result<&mut Self, SessionError> {
        if !self.components.contains_key(&edge.target) {
            return Err(SessionError::UnknownComponent {
                edge: edge.to_string(),
                module: edge.target.to_string(),
            });
        }
        if let EdgeSource::Variant { component, variant } = edge.from {
            let known = self
                .components
                .get(&component)
                .is_some_and(|c| c.variant(&variant).is_some());
            if !known {
                return Err(SessionError::UnknownSourceVariant {
                    edge: edge.to_string(),
                    module: component.to_string(),
                    variant: variant.to_string(),
                });
            }
        }
        self.edges.push(edge);
        Ok(self)
    }

    pub fn component(&self, module: &ModuleId) -> Option<&Component> {
        self.components.get(module)
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> + '_ {
        self.components.values()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn defaults(&self) -> &AttributeContainer {
        &self.defaults
    }

    /// Select a single variant of `module` for `request`, merged with the
    /// session defaults.
    pub fn select(
        &self,
        module: &ModuleId,
        request: &AttributeContainer,
    ) -> Option<Result<Variant, SelectionFailure>> {
        let component = self.components.get(module)?;
        let selector = VariantSelector::new(self.schema, self.docs);
        Some(selector.select(&request.with_defaults(&self.defaults), component))
    }

    /// Resolve every edge, then arbitrate capabilities.
    pub fn resolve(&self) -> Result<ResolvedGraph, SessionFailure> {
        tracing::debug!(
            "resolving {} edge(s) over {} component(s)",
            self.edges.len(),
            self.components.len()
        );

        let selector = VariantSelector::new(self.schema, self.docs);
        let results: Vec<Result<Variant, SelectionFailure>> = self
            .edges
            .par_iter()
            .map(|edge| self.select_edge(&selector, edge))
            .collect();

        let mut selected = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (edge, result) in self.edges.iter().zip(results) {
            match result {
                Ok(variant) => selected.push(variant),
                Err(failure) => {
                    tracing::debug!("edge {} failed: {}", edge, failure);
                    failures.push(ReportedFailure {
                        edge: Some(edge.to_string()),
                        failure,
                    });
                }
            }
        }
        if !failures.is_empty() {
            return Err(SessionFailure { failures });
        }

        let outcome = CapabilityConflictResolver::new(self.capability_rules, self.docs)
            .resolve(&selected)
            .map_err(SessionFailure::single)?;

        Ok(self.build_graph(&selected, &outcome.excluded))
    }

    fn select_edge(
        &self,
        selector: &VariantSelector<'_>,
        edge: &Edge,
    ) -> Result<Variant, SelectionFailure> {
        // Edges are validated on insertion.
        let component = &self.components[&edge.target];
        match edge.configuration {
            Some(configuration) => selector.select_configuration(component, &configuration),
            None => selector.select(&edge.request.with_defaults(&self.defaults), component),
        }
    }

    fn build_graph(&self, selected: &[Variant], excluded: &[Variant]) -> ResolvedGraph {
        let mut graph: DiGraph<GraphNode, ()> = DiGraph::new();
        let root = graph.add_node(GraphNode::Root);
        let mut nodes: HashMap<Variant, NodeIndex> = HashMap::new();
        let mut order: Vec<Variant> = Vec::new();

        for variant in selected {
            if excluded.contains(variant) || nodes.contains_key(variant) {
                continue;
            }
            let node = graph.add_node(GraphNode::Variant(variant.clone()));
            nodes.insert(variant.clone(), node);
            order.push(variant.clone());
        }

        for (edge, target) in self.edges.iter().zip(selected) {
            let Some(&to) = nodes.get(target) else {
                continue;
            };
            let from = match edge.from {
                EdgeSource::Root => root,
                EdgeSource::Variant { component, variant } => {
                    let Some(source) = self
                        .components
                        .get(&component)
                        .and_then(|c| c.variant(&variant))
                    else {
                        continue;
                    };
                    if excluded.contains(source) {
                        continue;
                    }
                    *nodes
                        .entry(source.clone())
                        .or_insert_with(|| graph.add_node(GraphNode::Variant(source.clone())))
                }
            };
            if !graph.contains_edge(from, to) {
                graph.add_edge(from, to, ());
            }
        }

        let mut reachable = vec![false; graph.node_count()];
        let mut dfs = Dfs::new(&graph, root);
        while let Some(node) = dfs.next(&graph) {
            reachable[node.index()] = true;
        }

        let (kept, orphaned): (Vec<Variant>, Vec<Variant>) = order
            .into_iter()
            .partition(|v| nodes.get(v).is_some_and(|n| reachable[n.index()]));
        for variant in &orphaned {
            tracing::warn!(
                "{} is only reachable through excluded variants",
                variant.display_name()
            );
        }

        let mut sorted: Vec<&Variant> = kept.iter().collect();
        sorted.sort_by_key(|v| (*v.owner(), v.name()));
        let mut fingerprint = Fingerprint::new();
        for variant in sorted {
            fingerprint.update_variant(variant);
        }

        ResolvedGraph {
            graph,
            root,
            nodes,
            kept,
            excluded: excluded.to_vec(),
            orphaned,
            fingerprint: fingerprint.finish(),
        }
    }
}

#[derive(Debug, Clone)]
enum GraphNode {
    Root,
    Variant(Variant),
}

/// The resolved variant graph.
///
/// Read-only once created. Excluded variants are not part of the graph.
#[derive(Debug, Clone)]
pub struct ResolvedGraph {
    graph: DiGraph<GraphNode, ()>,
    root: NodeIndex,
    nodes: HashMap<Variant, NodeIndex>,
    kept: Vec<Variant>,
    excluded: Vec<Variant>,
    orphaned: Vec<Variant>,
    fingerprint: String,
}

impl ResolvedGraph {
    /// Variants reachable from the root, in edge order.
    pub fn variants(&self) -> &[Variant] {
        &self.kept
    }

    pub fn excluded(&self) -> &[Variant] {
        &self.excluded
    }

    /// Selected variants that only excluded variants depended on.
    pub fn orphaned(&self) -> &[Variant] {
        &self.orphaned
    }

    /// SHA-256 over the kept variants, independent of edge order.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }

    /// Variants selected directly by the root.
    pub fn roots(&self) -> Vec<Variant> {
        self.neighbors(self.root, Direction::Outgoing)
    }

    /// Variants selected through edges starting at `variant`.
    pub fn dependencies(&self, variant: &Variant) -> Vec<Variant> {
        match self.nodes.get(variant) {
            Some(&node) => self.neighbors(node, Direction::Outgoing),
            None => Vec::new(),
        }
    }

    /// Variants whose edges selected `variant`.
    pub fn dependents(&self, variant: &Variant) -> Vec<Variant> {
        match self.nodes.get(variant) {
            Some(&node) => self.neighbors(node, Direction::Incoming),
            None => Vec::new(),
        }
    }

    fn neighbors(&self, node: NodeIndex, direction: Direction) -> Vec<Variant> {
        let mut variants: Vec<Variant> = self
            .graph
            .neighbors_directed(node, direction)
            .filter_map(|n| match &self.graph[n] {
                GraphNode::Variant(v) => Some(v.clone()),
                GraphNode::Root => None,
            })
            .collect();
        variants.sort_by_key(|v| (*v.owner(), v.name()));
        variants
    }

    /// Serializable summary of the graph.
    pub fn report(&self) -> ResolutionReport {
        ResolutionReport {
            fingerprint: self.fingerprint.clone(),
            variants: self
                .kept
                .iter()
                .map(|v| ResolvedVariant {
                    component: v.owner().to_string(),
                    variant: v.name().to_string(),
                    attributes: attribute_table(v.attributes()),
                    capabilities: v.capabilities().iter().map(|c| c.to_string()).collect(),
                    artifacts: v.artifacts().iter().map(|a| a.to_string()).collect(),
                    dependencies: self
                        .dependencies(v)
                        .iter()
                        .map(Variant::display_name)
                        .collect(),
                })
                .collect(),
            excluded: self.excluded.iter().map(Variant::display_name).collect(),
            orphaned: self.orphaned.iter().map(Variant::display_name).collect(),
        }
    }
}

/// JSON shape of a resolved graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    pub fingerprint: String,
    pub variants: Vec<ResolvedVariant>,
    pub excluded: Vec<String>,
    pub orphaned: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVariant {
    pub component: String,
    pub variant: String,
    pub attributes: AttributeTable,
    pub capabilities: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}
