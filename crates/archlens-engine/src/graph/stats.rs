//! Summary statistics for the visible graph.
//!
//! # Statistics Provided
//!
//! - **node_count** / **edge_count**: size of the visible graph.
//! - **density**: `edge_count / (node_count * (node_count - 1))`; zero for
//!   graphs with fewer than two nodes.
//! - **weakly_connected_component_count**: disjoint subgraphs when edge
//!   direction is ignored.
//! - **isolated_node_count**: nodes with no visible edge.
//! - **max_in_degree** / **max_out_degree**: busiest node in each direction.
//! - **self_edge_count**: edges left over from collapsing a subtree's
//!   internal dependencies.
//! - **cycle_edge_count** / **layer_edge_count**: edges carrying each
//!   violation flag.

use std::collections::HashMap;

use archlens_core::Graph;
use petgraph::algo::connected_components;
use petgraph::graph::UnGraph;
use serde::Serialize;

/// Summary statistics for a component graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub weakly_connected_component_count: usize,
    pub isolated_node_count: usize,
    pub max_in_degree: usize,
    pub max_out_degree: usize,
    pub self_edge_count: usize,
    pub cycle_edge_count: usize,
    pub layer_edge_count: usize,
}

impl GraphStats {
    /// Compute statistics for `graph`. Edges with an endpoint missing from
    /// the node collection are ignored for connectivity and degree.
    #[must_use]
    pub fn from_graph(graph: &Graph) -> Self {
        let node_count = graph.nodes.len();
        let edge_count = graph.edges.len();

        let index: HashMap<&str, usize> = graph
            .nodes
            .keys()
            .enumerate()
            .map(|(pos, id)| (id, pos))
            .collect();

        let mut in_degree = vec![0_usize; node_count];
        let mut out_degree = vec![0_usize; node_count];
        let mut undirected = UnGraph::<(), ()>::with_capacity(node_count, edge_count);
        let handles: Vec<_> = (0..node_count).map(|_| undirected.add_node(())).collect();

        for edge in &graph.edges {
            let (Some(&source), Some(&target)) =
                (index.get(edge.source.as_str()), index.get(edge.target.as_str()))
            else {
                continue;
            };
            out_degree[source] += 1;
            in_degree[target] += 1;
            undirected.add_edge(handles[source], handles[target], ());
        }

        let isolated_node_count = in_degree
            .iter()
            .zip(&out_degree)
            .filter(|&(&incoming, &outgoing)| incoming == 0 && outgoing == 0)
            .count();

        Self {
            node_count,
            edge_count,
            density: compute_density(node_count, edge_count),
            weakly_connected_component_count: connected_components(&undirected),
            isolated_node_count,
            max_in_degree: in_degree.iter().copied().max().unwrap_or(0),
            max_out_degree: out_degree.iter().copied().max().unwrap_or(0),
            self_edge_count: graph.edges.iter().filter(|e| e.is_self_loop()).count(),
            cycle_edge_count: graph.edges.iter().filter(|e| e.violations.cycle).count(),
            layer_edge_count: graph.edges.iter().filter(|e| e.violations.layer).count(),
        }
    }

    /// Return `true` if any visible edge carries a violation flag.
    #[must_use]
    pub const fn has_violations(&self) -> bool {
        self.cycle_edge_count > 0 || self.layer_edge_count > 0
    }
}

#[allow(clippy::cast_precision_loss)]
fn compute_density(node_count: usize, edge_count: usize) -> f64 {
    if node_count < 2 {
        return 0.0_f64;
    }
    let max_edges = (node_count * (node_count - 1)) as f64;
    edge_count as f64 / max_edges
}
