//! Mapping pre-abstraction edge references onto the visible graph.
//!
//! Both detectors find violations on the full record set, so their edge
//! references use original node ids. They are rewritten here with the same
//! replacement map and projection rule the processor applied to display
//! edges.

use archlens_core::ComponentEdge;

use crate::graph::{Hierarchy, ProcessedGraph};

/// Visible `(source, target)` standing for a pre-abstraction pair, if both
/// endpoints have a visible counterpart.
#[must_use]
pub fn rewrite_endpoints<'a>(
    source: &'a str,
    target: &'a str,
    processed: &'a ProcessedGraph,
    hierarchy: &'a Hierarchy,
) -> Option<(&'a str, &'a str)> {
    let source = processed.resolve_endpoint(hierarchy, source)?;
    let target = processed.resolve_endpoint(hierarchy, target)?;
    Some((source, target))
}

/// Id of the visible edge corresponding to `edge`; `None` when it was pruned
/// away entirely.
#[must_use]
pub fn remap_to_visible_graph<'a>(
    edge: &'a ComponentEdge,
    processed: &'a ProcessedGraph,
    hierarchy: &'a Hierarchy,
) -> Option<&'a str> {
    let (source, target) = rewrite_endpoints(&edge.source, &edge.target, processed, hierarchy)?;
    processed.edge_id_between(source, target)
}
