//! Full dependency graph over pre-abstraction edges.
//!
//! # Overview
//!
//! [`FullGraph`] holds every dependency edge from the deduplicated normalized
//! records as a [`petgraph`] directed graph. The cycle detector runs on it.
//!
//! ## Parallel edges
//!
//! Only the first edge per `(source, target)` pair enters the petgraph
//! graph; all edges remain available by id in [`FullGraph::edges`]. Parallel
//! edges always land on the same visible edge, so cycles through them would
//! only repeat after remapping.
//!
//! ## Cache Invalidation
//!
//! [`FullGraph::content_hash`] is a BLAKE3 hash of the sorted edge list and
//! changes only when the dependency edge set does.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;

use archlens_core::{ComponentEdge, IdMap, NormalizedRecord};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use tracing::instrument;

use super::normalize;

/// Directed graph of dependency edges; node weights are component ids and
/// edge weights are edge ids.
#[derive(Debug, Clone, Default)]
pub struct FullGraph {
    pub graph: DiGraph<String, String>,
    /// Mapping from component id to petgraph `NodeIndex`.
    pub node_map: HashMap<String, NodeIndex>,
    /// Every dependency edge by id, parallel edges included.
    pub edges: IdMap<ComponentEdge>,
    /// BLAKE3 content hash of the edge set.
    pub content_hash: String,
}

impl FullGraph {
    /// Build from the dependency runs of `records`.
    #[instrument(skip_all, fields(records = records.len()))]
    #[must_use]
    pub fn from_records(records: &[NormalizedRecord]) -> Self {
        Self::from_edges(normalize::dependency_edges(records).cloned())
    }

    #[must_use]
    pub fn from_edges(edges: impl IntoIterator<Item = ComponentEdge>) -> Self {
        let edges: IdMap<ComponentEdge> = edges.into_iter().collect();
        let content_hash = compute_edge_hash(&edges);

        let mut graph = DiGraph::<String, String>::new();
        let mut node_map: HashMap<String, NodeIndex> = HashMap::new();

        for edge in &edges {
            let source = *node_map
                .entry(edge.source.clone())
                .or_insert_with(|| graph.add_node(edge.source.clone()));
            let target = *node_map
                .entry(edge.target.clone())
                .or_insert_with(|| graph.add_node(edge.target.clone()));

            if !graph.contains_edge(source, target) {
                graph.add_edge(source, target, edge.id.clone());
            }
        }

        Self {
            graph,
            node_map,
            edges,
            content_hash,
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    /// The component edge behind a petgraph edge.
    #[must_use]
    pub fn edge(&self, idx: EdgeIndex) -> Option<&ComponentEdge> {
        self.graph
            .edge_weight(idx)
            .and_then(|id| self.edges.get(id))
    }
}

fn compute_edge_hash(edges: &IdMap<ComponentEdge>) -> String {
    let mut sorted: Vec<(&str, &str, &str)> = edges
        .iter()
        .map(|edge| (edge.source.as_str(), edge.target.as_str(), edge.id.as_str()))
        .collect();
    sorted.sort_unstable();

    let mut hasher = blake3::Hasher::new();
    for (source, target, id) in sorted {
        hasher.update(source.as_bytes());
        hasher.update(b"\x00");
        hasher.update(target.as_bytes());
        hasher.update(b"\x00");
        hasher.update(id.as_bytes());
        hasher.update(b"\x00");
    }
    format!("blake3:{}", hasher.finalize())
}
