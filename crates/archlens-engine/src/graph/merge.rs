//! Graph composition.

use archlens_core::Graph;
use tracing::debug;

/// Union node and edge collections by id.
///
/// Later graphs override attributes on id collision; iteration order is the
/// order in which ids were first seen.
#[must_use]
pub fn merge(graphs: impl IntoIterator<Item = Graph>) -> Graph {
    let mut merged = Graph::default();
    for graph in graphs {
        merged.nodes.union(graph.nodes);
        merged.edges.union(graph.edges);
    }
    debug!(
        nodes = merged.nodes.len(),
        edges = merged.edges.len(),
        "graphs merged"
    );
    merged
}
