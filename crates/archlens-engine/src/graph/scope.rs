//! Containment scope graph built from the parent and child chains.

use std::collections::HashSet;

use archlens_core::{Graph, IdMap, PathRecord};
use tracing::debug;

use super::hierarchy::Hierarchy;

/// Containment nodes and edges found in `records` that lie within
/// `max_depth` and agree with the linked hierarchy.
#[must_use]
pub fn containment_graph(
    records: &[PathRecord],
    hierarchy: &Hierarchy,
    containment_label: &str,
    max_depth: Option<u32>,
) -> Graph {
    let within = |id: &str| {
        hierarchy
            .node(id)
            .filter(|node| max_depth.is_none_or(|max| node.depth <= max))
    };

    let mut graph = Graph::new(IdMap::new(), IdMap::new());
    for rel in records
        .iter()
        .flat_map(|record| &record.relationships)
        .filter(|rel| rel.is_containment(containment_label))
    {
        let (Some(parent), Some(child)) = (within(&rel.start), within(&rel.end)) else {
            continue;
        };
        if child.parent.as_deref() != Some(parent.id.as_str()) {
            continue;
        }
        graph.nodes.insert(parent.clone());
        graph.nodes.insert(child.clone());
        graph.edges.insert(rel.to_edge());
    }
    graph
}

/// Drop scope nodes that are not visible in `visible`, not an ancestor of a
/// visible node, and not `selected`, together with their containment links.
pub fn restrict_to_visible(
    scope: &mut Graph,
    visible: &Graph,
    hierarchy: &Hierarchy,
    selected: Option<&str>,
) {
    let mut keep: HashSet<&str> = selected.into_iter().collect();
    for node in &visible.nodes {
        keep.insert(node.id.as_str());
        keep.extend(hierarchy.ancestors(&node.id).map(|ancestor| ancestor.id.as_str()));
    }

    let before = scope.nodes.len();
    scope.nodes.retain(|node| keep.contains(node.id.as_str()));
    scope
        .edges
        .retain(|edge| keep.contains(edge.source.as_str()) && keep.contains(edge.target.as_str()));
    debug!(before, after = scope.nodes.len(), "scope restricted to visible nodes");
}
