//! Containment hierarchy construction.
//!
//! # Overview
//!
//! Builds the component forest the processor abstracts over:
//!
//! 1. [`build_nodes`] collects every node described by any raw record (first
//!    occurrence wins for attributes).
//! 2. [`ContainmentIndex`] is built once over the raw chains and gives the
//!    parent and child lookups.
//! 3. [`link_hierarchy`] assigns parent/child ids. Nodes lacking an explicit
//!    `depth` get one derived from the forest (roots are depth 0).
//! 4. Leaf footprints are counted from the normalized dependency edges and
//!    [`rollup_footprint`] sums them bottom-up, one frontier at a time.
//!
//! Parent and child links are id references; the [`IdMap`] owns the nodes.

#![allow(clippy::module_name_repetitions)]

use std::collections::{HashMap, HashSet, VecDeque};

use archlens_core::{ComponentNode, Footprint, IdMap, LayerKind, NormalizedRecord, PathRecord};
use tracing::{debug, instrument};

use super::normalize;

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// The containment forest with computed depths and footprints.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    nodes: IdMap<ComponentNode>,
    /// Containment relationships ignored while linking.
    pub skipped_relationships: usize,
}

impl Hierarchy {
    /// Build the forest from every raw record the pipeline retrieved and the
    /// normalized dependency records used for leaf footprints.
    #[instrument(skip_all, fields(raw = raw.len(), normalized = normalized.len()))]
    #[must_use]
    pub fn build(
        raw: &[PathRecord],
        normalized: &[NormalizedRecord],
        containment_label: &str,
    ) -> Self {
        let mut table = build_nodes(raw);
        add_dependency_endpoints(&mut table, normalized);

        let index = ContainmentIndex::from_records(raw, containment_label);
        link_hierarchy(&mut table.nodes, &index);
        assign_depths(&mut table.nodes, &table.explicit_depth);
        seed_leaf_footprints(&mut table.nodes, normalized, &table.explicit_footprint);
        rollup_footprint(&mut table.nodes);

        debug!(
            nodes = table.nodes.len(),
            skipped = index.skipped,
            "containment hierarchy built"
        );

        Self {
            nodes: table.nodes,
            skipped_relationships: index.skipped,
        }
    }

    /// Wrap nodes whose parent, child, and depth fields are already set.
    #[must_use]
    pub fn from_nodes(nodes: IdMap<ComponentNode>) -> Self {
        Self {
            nodes,
            skipped_relationships: 0,
        }
    }

    #[must_use]
    pub const fn nodes(&self) -> &IdMap<ComponentNode> {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&ComponentNode> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Strict ancestors of `id`, nearest first.
    #[must_use]
    pub fn ancestors(&self, id: &str) -> Ancestors<'_> {
        Ancestors {
            nodes: &self.nodes,
            next: self.nodes.get(id).and_then(|node| node.parent.as_deref()),
            budget: self.nodes.len(),
        }
    }

    /// The ancestor of `id` sitting at exactly `depth`, if any.
    #[must_use]
    pub fn ancestor_at_depth(&self, id: &str, depth: u32) -> Option<&ComponentNode> {
        self.ancestors(id).find(|ancestor| ancestor.depth == depth)
    }

    #[must_use]
    pub fn is_strict_ancestor(&self, ancestor: &str, id: &str) -> bool {
        self.ancestors(id).any(|node| node.id == ancestor)
    }

    /// Architectural layer name of `id`: its own `layer` attribute, else the
    /// name of the nearest `Layer`-kind node among itself and its ancestors.
    #[must_use]
    pub fn architectural_layer(&self, id: &str) -> Option<&str> {
        let node = self.nodes.get(id)?;
        if let Some(layer) = node.layer.as_deref() {
            return Some(layer);
        }
        std::iter::once(node)
            .chain(self.ancestors(id))
            .find(|candidate| candidate.kind == LayerKind::Layer)
            .map(|layer| layer.name.as_str())
    }

    pub fn roots(&self) -> impl Iterator<Item = &ComponentNode> {
        self.nodes.iter().filter(|node| node.is_root())
    }
}

/// Iterator over a node's ancestors. Stops after visiting as many nodes as
/// the hierarchy holds, so a corrupted parent chain cannot loop forever.
#[derive(Debug)]
pub struct Ancestors<'a> {
    nodes: &'a IdMap<ComponentNode>,
    next: Option<&'a str>,
    budget: usize,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a ComponentNode;

    fn next(&mut self) -> Option<Self::Item> {
        if self.budget == 0 {
            return None;
        }
        self.budget -= 1;
        let node = self.nodes.get(self.next?)?;
        self.next = node.parent.as_deref();
        Some(node)
    }
}

// ---------------------------------------------------------------------------
// Node collection
// ---------------------------------------------------------------------------

/// Nodes plus which of them carried explicit attributes.
#[derive(Debug, Default)]
pub struct NodeTable {
    pub nodes: IdMap<ComponentNode>,
    pub explicit_depth: HashSet<String>,
    pub explicit_footprint: HashSet<String>,
}

/// Collect every node described by `records`; first occurrence wins.
#[must_use]
pub fn build_nodes(records: &[PathRecord]) -> NodeTable {
    let mut table = NodeTable::default();
    for raw in records.iter().flat_map(PathRecord::all_nodes) {
        if !table.nodes.insert(raw.to_component()) {
            continue;
        }
        if raw.depth().is_some() {
            table.explicit_depth.insert(raw.element_id.clone());
        }
        if raw.footprint().is_some() {
            table.explicit_footprint.insert(raw.element_id.clone());
        }
    }
    table
}

/// Dependency endpoints that no record describes become bare module nodes.
fn add_dependency_endpoints(table: &mut NodeTable, records: &[NormalizedRecord]) {
    for edge in normalize::dependency_edges(records) {
        for id in [&edge.source, &edge.target] {
            if table
                .nodes
                .insert(ComponentNode::new(id.as_str(), LayerKind::Module, 0))
            {
                debug!(node = %id, "dependency endpoint has no node descriptor");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Containment index
// ---------------------------------------------------------------------------

/// Parent and child lookups over observed containment relationships.
#[derive(Debug, Default)]
pub struct ContainmentIndex {
    parent_of: HashMap<String, String>,
    children_of: HashMap<String, Vec<String>>,
    /// Relationships ignored: unknown endpoint, second parent, or a link that
    /// would close a containment cycle.
    pub skipped: usize,
}

impl ContainmentIndex {
    /// Single pass over every relationship of every raw chain.
    #[must_use]
    pub fn from_records(records: &[PathRecord], containment_label: &str) -> Self {
        let mut index = Self::default();
        for record in records {
            let described = record.node_ids();
            for rel in &record.relationships {
                if !rel.is_containment(containment_label) {
                    continue;
                }
                let (parent, child) = (rel.start.as_str(), rel.end.as_str());
                if !described.contains(parent) || !described.contains(child) {
                    debug!(rel = %rel.element_id, "containment endpoint not described by its record");
                    index.skipped += 1;
                    continue;
                }
                index.link(parent, child, &rel.element_id);
            }
        }
        index
    }

    fn link(&mut self, parent: &str, child: &str, rel_id: &str) {
        match self.parent_of.get(child) {
            Some(existing) if existing == parent => return,
            Some(existing) => {
                debug!(rel = %rel_id, child, existing = %existing, "second parent ignored");
                self.skipped += 1;
                return;
            }
            None => {}
        }
        if parent == child || self.reaches_up(parent, child) {
            debug!(rel = %rel_id, parent, child, "containment cycle ignored");
            self.skipped += 1;
            return;
        }
        self.parent_of.insert(child.to_string(), parent.to_string());
        self.children_of
            .entry(parent.to_string())
            .or_default()
            .push(child.to_string());
    }

    /// Whether `target` is `from` or one of its recorded ancestors.
    fn reaches_up(&self, from: &str, target: &str) -> bool {
        let mut cursor = Some(from);
        let mut steps = 0;
        while let Some(id) = cursor {
            if id == target {
                return true;
            }
            steps += 1;
            if steps > self.parent_of.len() {
                return false;
            }
            cursor = self.parent_of.get(id).map(String::as_str);
        }
        false
    }

    #[must_use]
    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.parent_of.get(id).map(String::as_str)
    }

    #[must_use]
    pub fn children_of(&self, id: &str) -> &[String] {
        self.children_of
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Assign parent and children to every node from the index.
pub fn link_hierarchy(nodes: &mut IdMap<ComponentNode>, index: &ContainmentIndex) {
    let links: Vec<(String, Option<String>, Vec<String>)> = nodes
        .keys()
        .map(|id| {
            let parent = index
                .parent_of(id)
                .filter(|parent| nodes.contains_key(parent))
                .map(str::to_string);
            let children = index
                .children_of(id)
                .iter()
                .filter(|child| nodes.contains_key(child))
                .cloned()
                .collect();
            (id.to_string(), parent, children)
        })
        .collect();

    for (id, parent, children) in links {
        if let Some(node) = nodes.get_mut(&id) {
            node.parent = parent;
            node.children = children;
        }
    }
}

/// Derive depth top-down for nodes that did not carry one.
fn assign_depths(nodes: &mut IdMap<ComponentNode>, explicit: &HashSet<String>) {
    let mut queue: VecDeque<String> = nodes
        .iter()
        .filter(|node| node.is_root())
        .map(|node| node.id.clone())
        .collect();

    while let Some(id) = queue.pop_front() {
        let parent_depth = nodes
            .get(&id)
            .and_then(|node| node.parent.as_deref())
            .and_then(|parent| nodes.get(parent))
            .map(|parent| parent.depth);
        let Some(node) = nodes.get_mut(&id) else {
            continue;
        };
        if !explicit.contains(&id) {
            node.depth = parent_depth.map_or(0, |depth| depth + 1);
        }
        queue.extend(node.children.iter().cloned());
    }
}

// ---------------------------------------------------------------------------
// Footprints
// ---------------------------------------------------------------------------

/// Count leaf footprints from dependency edges: one outgoing slot per
/// category on the source, the incoming slot on the target.
fn seed_leaf_footprints(
    nodes: &mut IdMap<ComponentNode>,
    records: &[NormalizedRecord],
    explicit: &HashSet<String>,
) {
    let mut counts: HashMap<&str, Footprint> = HashMap::new();
    for edge in normalize::dependency_edges(records) {
        let outgoing = counts.entry(edge.source.as_str()).or_default();
        for category in &edge.categories {
            outgoing.bump(category.footprint_slot());
        }
        counts
            .entry(edge.target.as_str())
            .or_default()
            .bump(Footprint::INCOMING);
    }

    for node in nodes.iter_mut() {
        if node.is_leaf() && !explicit.contains(&node.id) {
            node.footprint = counts.get(node.id.as_str()).copied().unwrap_or_default();
        }
    }
}

/// Sum children's footprints into their parents, bottom-up.
///
/// The frontier starts at the leaves; a parent joins the next frontier once
/// all of its children have been computed, so every node is summed once.
pub fn rollup_footprint(nodes: &mut IdMap<ComponentNode>) {
    let mut pending: HashMap<String, usize> = nodes
        .iter()
        .map(|node| (node.id.clone(), node.children.len()))
        .collect();
    let mut frontier: Vec<String> = nodes
        .iter()
        .filter(|node| node.is_leaf())
        .map(|node| node.id.clone())
        .collect();

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for id in &frontier {
            let Some(parent) = nodes.get(id).and_then(|node| node.parent.clone()) else {
                continue;
            };
            if let Some(remaining) = pending.get_mut(&parent) {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    next.push(parent);
                }
            }
        }

        for id in &next {
            let sum = nodes.get(id).map_or_else(Footprint::zero, |node| {
                node.children
                    .iter()
                    .filter_map(|child| nodes.get(child))
                    .fold(Footprint::zero(), |mut acc, child| {
                        acc += child.footprint;
                        acc
                    })
            });
            if let Some(node) = nodes.get_mut(id) {
                node.footprint = sum;
            }
        }
        frontier = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archlens_core::{DependencyCategory, RawNode, RawRelationship};

    use crate::graph::normalize::split_into_chunks;

    const CONTAINS: &str = "CONTAINS";

    fn node(id: &str, kind: &str) -> RawNode {
        RawNode::new(id, &[kind])
    }

    fn chain(nodes: Vec<RawNode>, rels: Vec<RawRelationship>) -> PathRecord {
        let mut record = PathRecord::new(
            nodes[0].clone(),
            rels,
            nodes[nodes.len() - 1].clone(),
        );
        record.nodes = nodes;
        record
    }

    /// d -> l1 -> {m1, m2}, d -> l2 -> m3
    fn sample_tree() -> Vec<PathRecord> {
        vec![
            chain(
                vec![node("d", "Domain"), node("l1", "Layer"), node("m1", "Module")],
                vec![
                    RawRelationship::new("c1", CONTAINS, "d", "l1"),
                    RawRelationship::new("c2", CONTAINS, "l1", "m1"),
                ],
            ),
            chain(
                vec![node("l1", "Layer"), node("m2", "Module")],
                vec![RawRelationship::new("c3", CONTAINS, "l1", "m2")],
            ),
            chain(
                vec![node("d", "Domain"), node("l2", "Layer"), node("m3", "Module")],
                vec![
                    RawRelationship::new("c4", CONTAINS, "d", "l2"),
                    RawRelationship::new("c5", CONTAINS, "l2", "m3"),
                ],
            ),
        ]
    }

    fn dependency_record(id: &str, from: &str, to: &str, category: DependencyCategory) -> PathRecord {
        PathRecord::new(
            node(from, "Module"),
            vec![RawRelationship::new(id, "DEPENDS_ON", from, to).with_category(category)],
            node(to, "Module"),
        )
    }

    #[test]
    fn links_parents_children_and_depths() {
        let hierarchy = Hierarchy::build(&sample_tree(), &[], CONTAINS);

        let l1 = hierarchy.node("l1").expect("l1");
        assert_eq!(l1.parent.as_deref(), Some("d"));
        assert_eq!(l1.children, ["m1", "m2"]);
        assert_eq!(hierarchy.node("d").expect("d").depth, 0);
        assert_eq!(hierarchy.node("m3").expect("m3").depth, 2);
        assert_eq!(hierarchy.roots().count(), 1);
    }

    #[test]
    fn relationship_with_undescribed_endpoint_is_skipped() {
        let record = PathRecord::new(
            node("d", "Domain"),
            vec![
                RawRelationship::new("c1", CONTAINS, "d", "hidden"),
                RawRelationship::new("c2", CONTAINS, "hidden", "m"),
            ],
            node("m", "Module"),
        );
        let hierarchy = Hierarchy::build(&[record], &[], CONTAINS);
        assert_eq!(hierarchy.skipped_relationships, 2);
        assert!(hierarchy.node("m").expect("m").is_root());
    }

    #[test]
    fn containment_cycle_is_not_linked() {
        let record = chain(
            vec![node("a", "Layer"), node("b", "Module")],
            vec![
                RawRelationship::new("c1", CONTAINS, "a", "b"),
                RawRelationship::new("c2", CONTAINS, "b", "a"),
            ],
        );
        let hierarchy = Hierarchy::build(&[record], &[], CONTAINS);
        assert_eq!(hierarchy.skipped_relationships, 1);
        assert!(hierarchy.node("a").expect("a").is_root());
        assert_eq!(hierarchy.node("b").expect("b").depth, 1);
    }

    #[test]
    fn explicit_depth_is_kept() {
        let record = chain(
            vec![
                node("l", "Layer").with_property("depth", 2),
                node("m", "Module"),
            ],
            vec![RawRelationship::new("c1", CONTAINS, "l", "m")],
        );
        let hierarchy = Hierarchy::build(&[record], &[], CONTAINS);
        assert_eq!(hierarchy.node("l").expect("l").depth, 2);
        assert_eq!(hierarchy.node("m").expect("m").depth, 3);
    }

    #[test]
    fn footprints_roll_up_from_leaves() {
        let mut raw = sample_tree();
        raw.push(dependency_record("e1", "m1", "m3", DependencyCategory::Strong));
        raw.push(dependency_record("e2", "m2", "m3", DependencyCategory::Weak));
        let normalized = split_into_chunks(&raw, CONTAINS);

        let hierarchy = Hierarchy::build(&raw, &normalized, CONTAINS);
        let fp = |id: &str| hierarchy.node(id).expect(id).footprint;

        assert_eq!(fp("m1"), Footprint([0, 1, 0, 0]));
        assert_eq!(fp("m3"), Footprint([0, 0, 0, 2]));
        assert_eq!(fp("l1"), Footprint([1, 1, 0, 0]));
        assert_eq!(fp("l2"), Footprint([0, 0, 0, 2]));
        assert_eq!(fp("d"), Footprint([1, 1, 0, 2]));
    }

    #[test]
    fn rollup_waits_for_all_children() {
        // p has a leaf child and a child with its own leaf.
        let mut nodes = IdMap::new();
        let mut p = ComponentNode::new("p", LayerKind::Domain, 0);
        p.children = vec!["leaf".to_string(), "mid".to_string()];
        let mut leaf = ComponentNode::new("leaf", LayerKind::Layer, 1);
        leaf.parent = Some("p".to_string());
        leaf.footprint = Footprint([1, 0, 0, 0]);
        let mut mid = ComponentNode::new("mid", LayerKind::Layer, 1);
        mid.parent = Some("p".to_string());
        mid.children = vec!["deep".to_string()];
        let mut deep = ComponentNode::new("deep", LayerKind::Module, 2);
        deep.parent = Some("mid".to_string());
        deep.footprint = Footprint([0, 0, 3, 0]);
        nodes.extend([p, leaf, mid, deep]);

        rollup_footprint(&mut nodes);
        assert_eq!(nodes.get("mid").expect("mid").footprint, Footprint([0, 0, 3, 0]));
        assert_eq!(nodes.get("p").expect("p").footprint, Footprint([1, 0, 3, 0]));
    }

    #[test]
    fn explicit_leaf_footprint_wins() {
        let mut raw = vec![chain(
            vec![
                node("l", "Layer"),
                node("m", "Module").with_property("footprint", vec![5, 0, 0, 1]),
            ],
            vec![RawRelationship::new("c1", CONTAINS, "l", "m")],
        )];
        raw.push(dependency_record("e1", "m", "x", DependencyCategory::Weak));
        let normalized = split_into_chunks(&raw, CONTAINS);

        let hierarchy = Hierarchy::build(&raw, &normalized, CONTAINS);
        assert_eq!(hierarchy.node("m").expect("m").footprint, Footprint([5, 0, 0, 1]));
        assert_eq!(hierarchy.node("l").expect("l").footprint, Footprint([5, 0, 0, 1]));
    }

    #[test]
    fn architectural_layer_prefers_property_then_layer_ancestor() {
        let mut raw = sample_tree();
        raw.push(chain(
            vec![
                node("l2", "Layer"),
                node("m4", "Module").with_property("layer", "infrastructure"),
            ],
            vec![RawRelationship::new("c6", CONTAINS, "l2", "m4")],
        ));
        let hierarchy = Hierarchy::build(&raw, &[], CONTAINS);

        assert_eq!(hierarchy.architectural_layer("m1"), Some("l1"));
        assert_eq!(hierarchy.architectural_layer("l2"), Some("l2"));
        assert_eq!(hierarchy.architectural_layer("m4"), Some("infrastructure"));
        assert_eq!(hierarchy.architectural_layer("d"), None);
    }

    #[test]
    fn ancestor_lookup_by_depth() {
        let hierarchy = Hierarchy::build(&sample_tree(), &[], CONTAINS);
        assert_eq!(
            hierarchy.ancestor_at_depth("m1", 1).map(|n| n.id.as_str()),
            Some("l1")
        );
        assert!(hierarchy.ancestor_at_depth("m1", 2).is_none());
        assert!(hierarchy.is_strict_ancestor("d", "m2"));
        assert!(!hierarchy.is_strict_ancestor("m2", "m2"));
    }
}
