//! Elementary dependency cycles.
//!
//! # Overview
//!
//! [`find_cycles`] enumerates elementary cycles on the full
//! (pre-abstraction) dependency graph. Tarjan's SCC pass limits the search to
//! components that can hold a cycle; inside each component an iterative DFS
//! starts from every member and only walks members ordered after the start,
//! so each cycle is reported once, from its smallest node.
//!
//! The search is bounded by cycle length and by the number of cycles
//! collected. Reaching either bound sets [`CycleSearch::truncated`]; cycles
//! already found are kept.
//!
//! [`map_cycles_to_visible_graph`] rewrites cycles onto the visible graph,
//! drops those absorbed by abstraction, and deduplicates by edge-id set.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use archlens_core::config::CycleConfig;
use archlens_core::{ComponentEdge, Graph, RawRelationship};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::{debug, instrument, trace, warn};

use super::CycleViolation;
use super::remap::rewrite_endpoints;
use crate::graph::{FullGraph, Hierarchy, ProcessedGraph};

/// Ordered dependency edges returning to their first source.
pub type RawCycle = Vec<ComponentEdge>;

/// Outcome of a bounded cycle search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSearch {
    pub cycles: Vec<RawCycle>,
    /// A length or count bound stopped part of the search.
    pub truncated: bool,
}

impl fmt::Display for CycleSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cycle(s)", self.cycles.len())?;
        if self.truncated {
            write!(f, " (search truncated)")?;
        }
        Ok(())
    }
}

struct Frame {
    node: NodeIndex,
    successors: Vec<(NodeIndex, EdgeIndex)>,
    cursor: usize,
}

/// Enumerate elementary cycles of `full` within `bounds`.
#[instrument(skip_all, fields(nodes = full.node_count(), edges = full.edge_count()))]
#[must_use]
pub fn find_cycles(full: &FullGraph, bounds: CycleConfig) -> CycleSearch {
    let mut components: Vec<Vec<NodeIndex>> = tarjan_scc(&full.graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|mut component| {
            component.sort_unstable();
            component
        })
        .collect();
    components.sort_unstable();

    let mut search = CycleSearch::default();
    'components: for component in &components {
        let members: HashSet<NodeIndex> = component.iter().copied().collect();
        for &start in component {
            if !search_from(full, start, &members, bounds, &mut search) {
                break 'components;
            }
        }
    }

    if search.truncated {
        warn!(
            found = search.cycles.len(),
            max_depth = bounds.max_depth,
            max_cycles = bounds.max_cycles,
            "cycle search reached its bound"
        );
    } else {
        debug!(found = search.cycles.len(), "cycle search complete");
    }
    search
}

/// DFS from `start` over members ordered after it. Returns `false` once the
/// cycle budget is spent.
fn search_from(
    full: &FullGraph,
    start: NodeIndex,
    members: &HashSet<NodeIndex>,
    bounds: CycleConfig,
    search: &mut CycleSearch,
) -> bool {
    let successors = |node: NodeIndex| {
        let mut next: Vec<(NodeIndex, EdgeIndex)> = full
            .graph
            .edges(node)
            .map(|edge| (edge.target(), edge.id()))
            .filter(|(target, _)| *target != node && *target >= start && members.contains(target))
            .collect();
        next.sort_unstable();
        next
    };

    let mut path: Vec<EdgeIndex> = Vec::new();
    let mut on_path: HashSet<NodeIndex> = HashSet::from([start]);
    let mut stack = vec![Frame {
        node: start,
        successors: successors(start),
        cursor: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        let Some(&(next, edge)) = frame.successors.get(frame.cursor) else {
            on_path.remove(&frame.node);
            stack.pop();
            path.pop();
            continue;
        };
        frame.cursor += 1;

        if next == start {
            let cycle: RawCycle = path
                .iter()
                .chain(std::iter::once(&edge))
                .filter_map(|&idx| full.edge(idx).cloned())
                .collect();
            trace!(length = cycle.len(), "cycle found");
            search.cycles.push(cycle);
            if search.cycles.len() >= bounds.max_cycles {
                search.truncated = true;
                return false;
            }
            continue;
        }
        if on_path.contains(&next) {
            continue;
        }
        if path.len() + 2 > bounds.max_depth {
            search.truncated = true;
            continue;
        }

        on_path.insert(next);
        path.push(edge);
        stack.push(Frame {
            node: next,
            successors: successors(next),
            cursor: 0,
        });
    }
    true
}

/// Convert cycles reported by the graph store into edge sequences.
#[must_use]
pub fn cycles_from_relationships(cycles: Vec<Vec<RawRelationship>>) -> Vec<RawCycle> {
    cycles
        .into_iter()
        .map(|cycle| cycle.iter().map(RawRelationship::to_edge).collect())
        .collect()
}

/// Rewrite cycles onto the visible graph.
///
/// A cycle is dropped when an endpoint has no visible counterpart, when it
/// collapses onto fewer than two nodes, or when one of its rewritten edges is
/// not in the visible graph. Cycles with the same visible edge-id set are
/// reported once.
#[must_use]
pub fn map_cycles_to_visible_graph(
    cycles: &[RawCycle],
    processed: &ProcessedGraph,
    hierarchy: &Hierarchy,
) -> Vec<CycleViolation> {
    let mut seen: HashSet<BTreeSet<String>> = HashSet::new();
    let mut violations = Vec::new();
    let mut absorbed = 0_usize;

    'cycles: for cycle in cycles {
        let mut rewritten = Vec::with_capacity(cycle.len());
        for edge in cycle {
            let Some(endpoints) = rewrite_endpoints(&edge.source, &edge.target, processed, hierarchy)
            else {
                continue 'cycles;
            };
            rewritten.push(endpoints);
        }

        let distinct: HashSet<&str> = rewritten.iter().flat_map(|&(s, t)| [s, t]).collect();
        if distinct.len() < 2 {
            absorbed += 1;
            continue;
        }

        let mut edge_ids: Vec<String> = Vec::new();
        for (source, target) in rewritten {
            if source == target {
                continue;
            }
            let Some(id) = processed.edge_id_between(source, target) else {
                continue 'cycles;
            };
            if !edge_ids.iter().any(|existing| existing == id) {
                edge_ids.push(id.to_string());
            }
        }

        if seen.insert(edge_ids.iter().cloned().collect()) {
            violations.push(CycleViolation { edge_ids });
        }
    }

    debug!(
        raw = cycles.len(),
        absorbed,
        reported = violations.len(),
        "cycles mapped to visible graph"
    );
    violations
}

/// Set the cycle flag on every visible edge named by `violations`.
pub fn flag_cycle_edges(graph: &mut Graph, violations: &[CycleViolation]) {
    for id in violations.iter().flat_map(|violation| &violation.edge_ids) {
        if let Some(edge) = graph.edges.get_mut(id) {
            edge.violations.cycle = true;
        }
    }
}
