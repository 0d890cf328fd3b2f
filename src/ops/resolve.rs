//! Project resolution operations.

use std::collections::HashSet;

use anyhow::Result;

use crate::core::Variant;
use crate::ops::project::Project;
use crate::resolver::{ResolvedGraph, SessionFailure};

/// Outcome of resolving a project: the graph, or every selection failure.
pub type ResolveOutcome = std::result::Result<ResolvedGraph, SessionFailure>;

/// Resolve the project's session.
///
/// The outer error covers loading problems (invalid edges, duplicate
/// components); selection failures are returned in the inner result so
/// callers can render each of them.
pub fn resolve_project(project: &Project) -> Result<ResolveOutcome> {
    let session = project.session()?;
    let outcome = session.resolve();

    match &outcome {
        Ok(graph) => tracing::info!(
            "resolved {} variant(s), excluded {}, fingerprint {}",
            graph.len(),
            graph.excluded().len(),
            graph.fingerprint().get(..12).unwrap_or(graph.fingerprint())
        ),
        Err(failure) => tracing::debug!("{}", failure),
    }

    Ok(outcome)
}

/// Render a resolved graph as an indented tree from the root selections.
///
/// Variants reached more than once are printed again but not expanded,
/// marked with `(*)`.
pub fn format_tree(graph: &ResolvedGraph, max_depth: Option<usize>) -> String {
    let mut out = String::new();
    let mut seen = HashSet::new();
    let max_depth = max_depth.unwrap_or(usize::MAX);

    for root in graph.roots() {
        write_node(graph, &root, 0, max_depth, &mut seen, &mut out);
    }
    out
}

fn write_node(
    graph: &ResolvedGraph,
    variant: &Variant,
    depth: usize,
    max_depth: usize,
    seen: &mut HashSet<String>,
    out: &mut String,
) {
    if depth > max_depth {
        return;
    }

    let key = variant.display_name();
    let is_duplicate = !seen.insert(key.clone());

    let prefix = if depth == 0 {
        String::new()
    } else {
        format!("{}├── ", "│   ".repeat(depth - 1))
    };
    let marker = if is_duplicate { " (*)" } else { "" };
    out.push_str(&format!("{}{}{}\n", prefix, key, marker));

    if is_duplicate {
        return;
    }

    for dependency in graph.dependencies(variant) {
        write_node(graph, &dependency, depth + 1, max_depth, seen, out);
    }
}
