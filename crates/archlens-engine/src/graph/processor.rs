//! Depth abstraction, degree filtering, edge merging, and projection.
//!
//! # Overview
//!
//! [`GraphProcessor::process`] turns normalized records into the visible
//! graph. Stages run in a fixed order:
//!
//! 1. **Abstraction**: nodes deeper than `max_depth` map to their ancestor at
//!    exactly `max_depth` ([`ReplacementMap`]); dependency endpoints are
//!    rewritten, containment runs are not.
//! 2. **Range filter**: records touching a node whose distinct-neighbour count
//!    falls outside the configured outgoing/incoming bounds are dropped.
//! 3. **Merge**: dependency edges sharing `(source, target)` collapse into one
//!    edge carrying the union of categories and violation flags. The first
//!    edge seen keeps its id.
//! 4. **Prune**: only endpoints of surviving edges (and the selected node)
//!    stay visible. Nodes deeper than `max_depth` are never visible.
//! 5. **Projection**: an endpoint that is still hidden is rewritten to its
//!    nearest visible ancestor, materialising one within the depth bound when
//!    none is visible yet. Edges with no such ancestor are dropped.
//! 6. **Self edges**: optionally removed.
//!
//! The replacement map and the projection rule are kept on the
//! [`ProcessedGraph`] so violation detectors rewrite their edge references
//! the same way display edges were rewritten.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeMap, HashMap, HashSet};

use archlens_core::config::{DegreeRange, ProcessorConfig};
use archlens_core::{ComponentEdge, ComponentNode, Graph, IdMap, NormalizedRecord};
use serde::Serialize;
use tracing::{debug, instrument, trace};

use super::hierarchy::Hierarchy;

// ---------------------------------------------------------------------------
// ReplacementMap
// ---------------------------------------------------------------------------

/// Node id → id of its retained ancestor at the abstraction depth.
///
/// Not injective: every descendant of an ancestor maps onto it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReplacementMap {
    map: BTreeMap<String, String>,
    /// Nodes deeper than the threshold with no ancestor at exactly that depth.
    #[serde(skip)]
    pub unmapped: Vec<String>,
}

impl ReplacementMap {
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&str> {
        self.map.get(id).map(String::as_str)
    }

    /// `id` rewritten through the map, or `id` itself when unmapped.
    #[must_use]
    pub fn rewrite<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).unwrap_or(id)
    }

    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.map.insert(from.into(), to.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(from, to)| (from.as_str(), to.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Which end of a dependency edge a degree bound counts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
}

// ---------------------------------------------------------------------------
// GraphProcessor
// ---------------------------------------------------------------------------

/// Produces the visible graph for one invocation.
#[derive(Debug, Clone, Copy)]
pub struct GraphProcessor<'a> {
    hierarchy: &'a Hierarchy,
    config: &'a ProcessorConfig,
    selected: Option<&'a str>,
}

impl<'a> GraphProcessor<'a> {
    #[must_use]
    pub const fn new(hierarchy: &'a Hierarchy, config: &'a ProcessorConfig) -> Self {
        Self {
            hierarchy,
            config,
            selected: None,
        }
    }

    /// Keep `selected` visible even when no surviving edge touches it.
    #[must_use]
    pub const fn with_selected(mut self, selected: Option<&'a str>) -> Self {
        self.selected = selected;
        self
    }

    /// Run every stage in order over the normalized records.
    #[instrument(skip_all, fields(records = records.len(), max_depth = ?self.config.max_depth))]
    #[must_use]
    pub fn process(&self, records: &[NormalizedRecord]) -> ProcessedGraph {
        let replacement = self.compute_abstraction_map();
        let abstracted = apply_abstraction(records, &replacement);
        let filtered = retain_in_ranges(
            abstracted,
            &[
                (Direction::Outgoing, self.config.outgoing),
                (Direction::Incoming, self.config.incoming),
            ],
        );
        let merged = merge_duplicate_edges(collect_edges(&filtered));
        let mut nodes = self.prune_unreferenced_nodes(&merged);
        let mut edges = self.project_onto_visible_ancestors(&mut nodes, merged);
        if !self.config.include_self_edges {
            filter_self_edges(&mut edges);
        }

        debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            replaced = replacement.len(),
            "visible graph ready"
        );
        ProcessedGraph::new(Graph::new(nodes, edges), replacement, self.config.max_depth)
    }

    /// Map every node deeper than `max_depth` to its ancestor at exactly
    /// `max_depth`. Empty when no depth is configured.
    #[must_use]
    pub fn compute_abstraction_map(&self) -> ReplacementMap {
        let mut replacement = ReplacementMap::default();
        let Some(max_depth) = self.config.max_depth else {
            return replacement;
        };

        for node in self.hierarchy.nodes().iter().filter(|n| n.depth > max_depth) {
            match self.hierarchy.ancestor_at_depth(&node.id, max_depth) {
                Some(ancestor) => replacement.insert(node.id.as_str(), ancestor.id.as_str()),
                None => {
                    trace!(node = %node.id, max_depth, "no ancestor at abstraction depth");
                    replacement.unmapped.push(node.id.clone());
                }
            }
        }
        replacement
    }

    /// Endpoints of `edges` (plus the selected node) that lie within the
    /// depth bound.
    #[must_use]
    pub fn prune_unreferenced_nodes(&self, edges: &IdMap<ComponentEdge>) -> IdMap<ComponentNode> {
        let mut visible = IdMap::new();
        let candidates = edges
            .iter()
            .flat_map(|edge| [edge.source.as_str(), edge.target.as_str()])
            .chain(self.selected);

        for id in candidates {
            if let Some(node) = self.hierarchy.node(id).filter(|node| self.within_depth(node)) {
                visible.insert(node.clone());
            }
        }
        visible
    }

    /// Rewrite hidden endpoints onto visible ancestors, then re-merge.
    pub fn project_onto_visible_ancestors(
        &self,
        nodes: &mut IdMap<ComponentNode>,
        edges: IdMap<ComponentEdge>,
    ) -> IdMap<ComponentEdge> {
        let mut projected = Vec::with_capacity(edges.len());
        let mut dropped = 0_usize;

        for mut edge in edges {
            let source = self.visible_endpoint(nodes, &edge.source);
            let target = self.visible_endpoint(nodes, &edge.target);
            let (Some(source), Some(target)) = (source, target) else {
                trace!(edge = %edge.id, "no visible ancestor for endpoint");
                dropped += 1;
                continue;
            };
            edge.source = source;
            edge.target = target;
            projected.push(edge);
        }

        if dropped > 0 {
            debug!(dropped, "edges without a visible ancestor dropped");
        }
        merge_duplicate_edges(projected)
    }

    /// `id` if visible; otherwise its nearest visible ancestor; otherwise its
    /// nearest ancestor within the depth bound, which becomes visible.
    fn visible_endpoint(&self, nodes: &mut IdMap<ComponentNode>, id: &str) -> Option<String> {
        if nodes.contains_key(id) {
            return Some(id.to_string());
        }

        let mut fallback: Option<&ComponentNode> = None;
        for ancestor in self.hierarchy.ancestors(id) {
            if nodes.contains_key(&ancestor.id) {
                return Some(ancestor.id.clone());
            }
            if fallback.is_none() && self.within_depth(ancestor) {
                fallback = Some(ancestor);
            }
        }

        fallback.map(|ancestor| {
            nodes.insert(ancestor.clone());
            ancestor.id.clone()
        })
    }

    fn within_depth(&self, node: &ComponentNode) -> bool {
        self.config.max_depth.is_none_or(|max| node.depth <= max)
    }
}

// ---------------------------------------------------------------------------
// Record and edge stages
// ---------------------------------------------------------------------------

/// Rewrite dependency endpoints through `replacement`. Duplicates created by
/// the rewrite are left for [`merge_duplicate_edges`].
#[must_use]
pub fn apply_abstraction(
    records: &[NormalizedRecord],
    replacement: &ReplacementMap,
) -> Vec<NormalizedRecord> {
    records
        .iter()
        .map(|record| {
            let mut record = record.clone();
            for edge in &mut record.dependency_edges {
                if let Some(ancestor) = replacement.get(&edge.source) {
                    edge.source = ancestor.to_string();
                }
                if let Some(ancestor) = replacement.get(&edge.target) {
                    edge.target = ancestor.to_string();
                }
            }
            record
        })
        .collect()
}

/// Drop records touching a node whose distinct-neighbour count in
/// `direction` falls outside `range`.
#[must_use]
pub fn apply_relationship_range_filter(
    records: Vec<NormalizedRecord>,
    direction: Direction,
    range: DegreeRange,
) -> Vec<NormalizedRecord> {
    retain_in_ranges(records, &[(direction, range)])
}

/// Degree filter over several bounds, all counted on the same input.
fn retain_in_ranges(
    records: Vec<NormalizedRecord>,
    bounds: &[(Direction, DegreeRange)],
) -> Vec<NormalizedRecord> {
    let active: Vec<(Direction, DegreeRange)> = bounds
        .iter()
        .copied()
        .filter(|(_, range)| !range.is_unbounded())
        .collect();
    if active.is_empty() {
        return records;
    }

    let keep: Vec<bool> = {
        let counts: Vec<(HashMap<&str, usize>, DegreeRange)> = active
            .iter()
            .map(|&(direction, range)| (neighbour_counts(&records, direction), range))
            .collect();

        records
            .iter()
            .map(|record| {
                record.is_pure_containment()
                    || record.dependency_endpoints().into_iter().all(|id| {
                        counts.iter().all(|(count, range)| {
                            range.contains(count.get(id).copied().unwrap_or_default())
                        })
                    })
            })
            .collect()
    };

    let before = records.len();
    let kept: Vec<NormalizedRecord> = records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, keep)| keep.then_some(record))
        .collect();
    debug!(before, after = kept.len(), "relationship range filter applied");
    kept
}

/// Distinct neighbours per node in one direction, self excluded.
fn neighbour_counts(records: &[NormalizedRecord], direction: Direction) -> HashMap<&str, usize> {
    let mut neighbours: HashMap<&str, HashSet<&str>> = HashMap::new();
    for edge in records.iter().flat_map(|record| &record.dependency_edges) {
        let (from, to) = match direction {
            Direction::Outgoing => (edge.source.as_str(), edge.target.as_str()),
            Direction::Incoming => (edge.target.as_str(), edge.source.as_str()),
        };
        let entry = neighbours.entry(from).or_default();
        if from != to {
            entry.insert(to);
        }
    }
    neighbours
        .into_iter()
        .map(|(id, set)| (id, set.len()))
        .collect()
}

/// Flatten the dependency runs of every surviving record.
#[must_use]
pub fn collect_edges(records: &[NormalizedRecord]) -> Vec<ComponentEdge> {
    records
        .iter()
        .flat_map(|record| record.dependency_edges.iter().cloned())
        .collect()
}

/// Collapse edges sharing `(source, target)`; the first edge of each group
/// keeps its id and absorbs the others' categories and flags.
#[must_use]
pub fn merge_duplicate_edges(edges: impl IntoIterator<Item = ComponentEdge>) -> IdMap<ComponentEdge> {
    let mut position: HashMap<(String, String), usize> = HashMap::new();
    let mut merged: Vec<ComponentEdge> = Vec::new();

    for edge in edges {
        let key = (edge.source.clone(), edge.target.clone());
        if let Some(existing) = position.get(&key).and_then(|&pos| merged.get_mut(pos)) {
            existing.absorb(&edge);
        } else {
            position.insert(key, merged.len());
            merged.push(edge);
        }
    }
    merged.into_iter().collect()
}

/// Remove edges whose source equals their target.
pub fn filter_self_edges(edges: &mut IdMap<ComponentEdge>) {
    edges.retain(|edge| !edge.is_self_loop());
}

// ---------------------------------------------------------------------------
// ProcessedGraph
// ---------------------------------------------------------------------------

/// The visible graph plus what is needed to map pre-abstraction edge
/// references onto it.
#[derive(Debug, Clone)]
pub struct ProcessedGraph {
    pub graph: Graph,
    pub replacement: ReplacementMap,
    max_depth: Option<u32>,
    edge_index: HashMap<(String, String), String>,
}

impl ProcessedGraph {
    #[must_use]
    pub fn new(graph: Graph, replacement: ReplacementMap, max_depth: Option<u32>) -> Self {
        let edge_index = graph
            .edges
            .iter()
            .map(|edge| ((edge.source.clone(), edge.target.clone()), edge.id.clone()))
            .collect();
        Self {
            graph,
            replacement,
            max_depth,
            edge_index,
        }
    }

    /// Visible node standing for the pre-abstraction node `id`.
    ///
    /// Applies the replacement map, then, for a node hidden only by the depth
    /// bound, the nearest visible ancestor. Nodes pruned by filtering have no
    /// visible counterpart.
    #[must_use]
    pub fn resolve_endpoint<'h>(&self, hierarchy: &'h Hierarchy, id: &'h str) -> Option<&'h str> {
        let id = self.replacement.get(id).map_or(id, |mapped| {
            hierarchy.node(mapped).map_or(id, |node| node.id.as_str())
        });
        if self.graph.nodes.contains_key(id) {
            return Some(id);
        }

        let node = hierarchy.node(id)?;
        let too_deep = self.max_depth.is_some_and(|max| node.depth > max);
        if !too_deep {
            return None;
        }
        hierarchy
            .ancestors(id)
            .find(|ancestor| self.graph.nodes.contains_key(&ancestor.id))
            .map(|ancestor| ancestor.id.as_str())
    }

    /// Id of the visible edge running `source -> target`.
    #[must_use]
    pub fn edge_id_between(&self, source: &str, target: &str) -> Option<&str> {
        self.edge_index
            .get(&(source.to_string(), target.to_string()))
            .map(String::as_str)
    }

    #[must_use]
    pub fn into_graph(self) -> Graph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archlens_core::DependencyCategory::{Entity, Strong, Weak};
    use archlens_core::{PathRecord, RawNode, RawRelationship};

    use crate::graph::fixtures::{CONTAINS, build, dep, layered_tree, tree};

    fn config(max_depth: Option<u32>) -> ProcessorConfig {
        ProcessorConfig {
            max_depth,
            ..ProcessorConfig::default()
        }
    }

    fn edge_pairs(graph: &Graph) -> Vec<(String, String)> {
        graph
            .edges
            .iter()
            .map(|edge| (edge.source.clone(), edge.target.clone()))
            .collect()
    }

    #[test]
    fn sibling_modules_collapse_onto_layers() {
        let mut raw = tree(&[
            ("d", "Domain", None),
            ("l1", "Layer", Some("d")),
            ("l2", "Layer", Some("d")),
            ("m1", "Module", Some("l1")),
            ("m2", "Module", Some("l2")),
        ]);
        raw.push(dep("e1", "m1", "m2", Weak));
        let (hierarchy, records) = build(&raw);

        let cfg = config(Some(1));
        let processed = GraphProcessor::new(&hierarchy, &cfg).process(&records);

        let ids: Vec<&str> = processed.graph.nodes.keys().collect();
        assert_eq!(ids, ["l1", "l2"]);
        assert_eq!(processed.graph.edges.len(), 1);
        let edge = processed.graph.edges.get("e1").expect("aggregated edge");
        assert_eq!((edge.source.as_str(), edge.target.as_str()), ("l1", "l2"));
        assert_eq!(edge.categories, vec![Weak]);
    }

    #[test]
    fn parallel_edges_merge_categories() {
        let mut raw = layered_tree();
        raw.push(dep("e1", "m1", "m3", Weak));
        raw.push(dep("e2", "m1", "m3", Strong));
        let (hierarchy, records) = build(&raw);

        let cfg = config(None);
        let processed = GraphProcessor::new(&hierarchy, &cfg).process(&records);

        assert_eq!(processed.graph.edges.len(), 1);
        let edge = processed.graph.edges.get("e1").expect("first id kept");
        assert_eq!(edge.categories, vec![Weak, Strong]);
    }

    #[test]
    fn abstraction_maps_to_ancestor_at_threshold() {
        let (hierarchy, _) = build(&layered_tree());
        let cfg = config(Some(2));
        let map = GraphProcessor::new(&hierarchy, &cfg).compute_abstraction_map();

        assert_eq!(map.get("m1"), Some("l1"));
        assert_eq!(map.get("m4"), Some("l2"));
        assert_eq!(map.get("l1"), None);
        assert_eq!(map.len(), 4);
        for (from, to) in map.iter() {
            assert_eq!(hierarchy.node(to).expect("ancestor").depth, 2);
            assert!(hierarchy.is_strict_ancestor(to, from));
        }
    }

    #[test]
    fn abstraction_skipped_without_depth() {
        let (hierarchy, _) = build(&layered_tree());
        let cfg = config(None);
        assert!(GraphProcessor::new(&hierarchy, &cfg)
            .compute_abstraction_map()
            .is_empty());
    }

    #[test]
    fn outgoing_minimum_drops_sink_nodes() {
        let mut raw = layered_tree();
        raw.push(dep("e1", "m1", "m2", Weak));
        raw.push(dep("e2", "m2", "m3", Weak));
        raw.push(dep("e3", "m3", "m4", Strong));
        let (hierarchy, records) = build(&raw);

        let cfg = ProcessorConfig {
            outgoing: DegreeRange::new(Some(1), None),
            ..ProcessorConfig::default()
        };
        let processed = GraphProcessor::new(&hierarchy, &cfg).process(&records);

        assert!(!processed.graph.nodes.contains_key("m4"));
        assert!(processed.graph.edges.iter().all(|edge| edge.target != "m4"));
        assert_eq!(processed.graph.edges.len(), 2);
    }

    #[test]
    fn range_filter_counts_distinct_neighbours() {
        let mut raw = layered_tree();
        raw.push(dep("e1", "m1", "m2", Weak));
        raw.push(dep("e2", "m1", "m2", Strong));
        raw.push(dep("e3", "m3", "m2", Entity));
        raw.push(dep("e4", "m3", "m4", Entity));
        let (_, records) = build(&raw);

        let kept = apply_relationship_range_filter(
            records,
            Direction::Outgoing,
            DegreeRange::new(None, Some(1)),
        );
        let sequences: Vec<String> = kept
            .iter()
            .filter(|record| !record.is_pure_containment())
            .map(NormalizedRecord::sequence_id)
            .collect();
        // m1 has two edges to one neighbour; m3 has two neighbours.
        assert_eq!(sequences, ["e1", "e2"]);
    }

    #[test]
    fn deeper_endpoint_collapses_onto_threshold_ancestor() {
        let mut raw = layered_tree();
        raw.extend(tree(&[("x", "Module", Some("m1"))]));
        raw.push(dep("e1", "x", "m3", Weak));
        let (hierarchy, records) = build(&raw);

        let cfg = config(Some(3));
        let processed = GraphProcessor::new(&hierarchy, &cfg).process(&records);
        assert_eq!(edge_pairs(&processed.graph), [("m1".to_string(), "m3".to_string())]);
        assert!(processed.graph.dangling_edges().is_empty());
    }

    #[test]
    fn unmapped_deep_node_projects_onto_nearest_ancestor() {
        // m claims depth 3 directly below a depth-1 layer: nothing sits at depth 2.
        let mut raw = tree(&[("d", "Domain", None), ("l", "Layer", Some("d"))]);
        let m = RawNode::new("m", &["Module"]).with_property("depth", 3);
        let mut jump = PathRecord::new(
            RawNode::new("l", &["Layer"]),
            vec![RawRelationship::new("c:l:m", CONTAINS, "l", "m")],
            m.clone(),
        );
        jump.nodes = vec![jump.source.clone(), m];
        raw.push(jump);
        raw.extend(tree(&[("n", "Module", None)]));
        raw.push(dep("e1", "m", "n", Weak));
        let (hierarchy, records) = build(&raw);

        let cfg = config(Some(2));
        let processor = GraphProcessor::new(&hierarchy, &cfg);
        let map = processor.compute_abstraction_map();
        assert_eq!(map.get("m"), None);
        assert_eq!(map.unmapped, ["m"]);

        let processed = processor.process(&records);
        assert_eq!(edge_pairs(&processed.graph), [("l".to_string(), "n".to_string())]);
        assert_eq!(processed.resolve_endpoint(&hierarchy, "m"), Some("l"));
    }

    #[test]
    fn self_edges_are_optional() {
        let mut raw = layered_tree();
        raw.push(dep("e1", "m1", "m2", Weak));
        raw.push(dep("e2", "m1", "m3", Weak));
        let (hierarchy, records) = build(&raw);

        let with_self = config(Some(2));
        let processed = GraphProcessor::new(&hierarchy, &with_self).process(&records);
        assert!(processed.graph.edge_between("l1", "l1").is_some());

        let without_self = ProcessorConfig {
            include_self_edges: false,
            ..config(Some(2))
        };
        let processed = GraphProcessor::new(&hierarchy, &without_self).process(&records);
        assert!(processed.graph.edge_between("l1", "l1").is_none());
        assert!(processed.graph.edge_between("l1", "l2").is_some());
    }

    #[test]
    fn selected_node_stays_visible() {
        let mut raw = layered_tree();
        raw.push(dep("e1", "m1", "m3", Weak));
        let (hierarchy, records) = build(&raw);

        let cfg = config(None);
        let processed = GraphProcessor::new(&hierarchy, &cfg)
            .with_selected(Some("m4"))
            .process(&records);
        assert!(processed.graph.nodes.contains_key("m4"));
    }

    #[test]
    fn resolve_endpoint_follows_replacement_and_depth() {
        let mut raw = layered_tree();
        raw.push(dep("e1", "m1", "m3", Weak));
        let (hierarchy, records) = build(&raw);

        let cfg = config(Some(2));
        let processed = GraphProcessor::new(&hierarchy, &cfg).process(&records);
        assert_eq!(processed.resolve_endpoint(&hierarchy, "m2"), Some("l1"));
        assert_eq!(processed.resolve_endpoint(&hierarchy, "l2"), Some("l2"));
        assert_eq!(processed.resolve_endpoint(&hierarchy, "d"), None);
        assert_eq!(processed.edge_id_between("l1", "l2"), Some("e1"));
    }

    #[test]
    fn processing_is_idempotent() {
        let mut raw = layered_tree();
        raw.push(dep("e1", "m1", "m3", Weak));
        raw.push(dep("e2", "m3", "m2", Strong));
        raw.push(dep("e3", "m4", "m4", Entity));
        let (hierarchy, records) = build(&raw);

        let cfg = config(Some(2));
        let processor = GraphProcessor::new(&hierarchy, &cfg);
        let first = processor.process(&records).into_graph();
        let second = processor.process(&records).into_graph();
        assert_eq!(first, second);
    }
}
