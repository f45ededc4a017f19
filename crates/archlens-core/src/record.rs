//! Raw path records returned by the external graph store, and their
//! normalized form.
//!
//! # Input contract
//!
//! One [`PathRecord`] is a single traversal result: a source node, the ordered
//! relationship chain walked from it, and the target node. The optional
//! `nodes` list carries every node along the path when the store exports it.
//!
//! Field names accept both the snake_case form and the camelCase names used
//! by the store's JSON driver (`elementId`, `startNodeElementId`, ...).
//!
//! # Normalized form
//!
//! [`NormalizedRecord`] splits the chain into homogeneous runs: the leading
//! containment run (source down to the first dependency), the dependency run,
//! and the trailing containment run (reversed, so it reads from the target
//! ancestor down to the last dependency target).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{ComponentEdge, ComponentNode, DependencyCategory, Footprint, LayerKind};

/// Node properties interpreted by the pipeline; everything else is metadata.
const KNOWN_NODE_PROPERTIES: [&str; 5] = ["name", "depth", "layer", "color", "footprint"];

/// A node descriptor as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(alias = "elementId", alias = "id")]
    pub element_id: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl RawNode {
    #[must_use]
    pub fn new(id: impl Into<String>, labels: &[&str]) -> Self {
        Self {
            element_id: id.into(),
            labels: labels.iter().map(|label| (*label).to_string()).collect(),
            properties: Map::new(),
        }
    }

    /// Builder-style property setter, mostly for fixtures.
    #[must_use]
    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.properties
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(&self.element_id)
    }

    /// Explicit depth property, if the store supplied a usable one.
    #[must_use]
    pub fn depth(&self) -> Option<u32> {
        self.properties
            .get("depth")
            .and_then(Value::as_u64)
            .and_then(|depth| u32::try_from(depth).ok())
    }

    #[must_use]
    pub fn kind(&self) -> LayerKind {
        LayerKind::from_labels(&self.labels)
    }

    /// Explicit leaf footprint (`[w, s, e, in]`); ignored unless it has
    /// exactly four non-negative integers.
    #[must_use]
    pub fn footprint(&self) -> Option<Footprint> {
        let values = self.properties.get("footprint")?.as_array()?;
        if values.len() != 4 {
            return None;
        }
        let mut slots = [0_u64; 4];
        for (slot, value) in slots.iter_mut().zip(values) {
            *slot = value.as_u64()?;
        }
        Some(Footprint(slots))
    }

    fn string_property(&self, key: &str) -> Option<String> {
        self.properties
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Convert to a component node. Depth falls back to `0` when absent;
    /// the hierarchy builder recomputes it from the containment forest.
    #[must_use]
    pub fn to_component(&self) -> ComponentNode {
        let metadata: Map<String, Value> = self
            .properties
            .iter()
            .filter(|(key, _)| !KNOWN_NODE_PROPERTIES.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        ComponentNode {
            id: self.element_id.clone(),
            name: self.name().to_string(),
            kind: self.kind(),
            depth: self.depth().unwrap_or(0),
            layer: self.string_property("layer"),
            color: self.string_property("color"),
            footprint: self.footprint().unwrap_or_default(),
            parent: None,
            children: Vec::new(),
            metadata,
        }
    }
}

/// A relationship descriptor as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRelationship {
    #[serde(alias = "elementId", alias = "id")]
    pub element_id: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(alias = "startNodeElementId")]
    pub start: String,
    #[serde(alias = "endNodeElementId")]
    pub end: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl RawRelationship {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        rel_type: &str,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            element_id: id.into(),
            rel_type: rel_type.to_string(),
            start: start.into(),
            end: end.into(),
            properties: Map::new(),
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: DependencyCategory) -> Self {
        self.properties
            .insert("category".to_string(), Value::String(category.to_string()));
        self
    }

    /// Dependency category; unknown or missing values yield `None`.
    #[must_use]
    pub fn category(&self) -> Option<DependencyCategory> {
        self.properties
            .get("category")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok())
    }

    #[must_use]
    pub fn is_containment(&self, label: &str) -> bool {
        self.rel_type == label
    }

    #[must_use]
    pub fn to_edge(&self) -> ComponentEdge {
        ComponentEdge {
            id: self.element_id.clone(),
            source: self.start.clone(),
            target: self.end.clone(),
            rel_type: self.rel_type.clone(),
            categories: self.category().into_iter().collect(),
            violations: crate::model::ViolationFlags::default(),
        }
    }
}

/// One raw traversal result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRecord {
    pub source: RawNode,
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
    pub target: RawNode,
    /// Every node along the path, when exported.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<RawNode>,
}

impl PathRecord {
    #[must_use]
    pub fn new(source: RawNode, relationships: Vec<RawRelationship>, target: RawNode) -> Self {
        Self {
            source,
            relationships,
            target,
            nodes: Vec::new(),
        }
    }

    /// Source, path nodes, and target, in that order (may repeat ids).
    pub fn all_nodes(&self) -> impl Iterator<Item = &RawNode> {
        std::iter::once(&self.source)
            .chain(self.nodes.iter())
            .chain(std::iter::once(&self.target))
    }

    /// Ids of every node this record describes.
    #[must_use]
    pub fn node_ids(&self) -> HashSet<&str> {
        self.all_nodes().map(|node| node.element_id.as_str()).collect()
    }
}

/// A path record split into homogeneous relationship runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub source: String,
    pub target: String,
    pub contain_source_edges: Vec<ComponentEdge>,
    pub dependency_edges: Vec<ComponentEdge>,
    pub contain_target_edges: Vec<ComponentEdge>,
    /// Containment hops spanned by the record (leading plus trailing run).
    pub target_depth: usize,
}

impl NormalizedRecord {
    /// Ordered dependency-edge ids joined with `,`; empty for pure
    /// containment records.
    #[must_use]
    pub fn sequence_id(&self) -> String {
        self.dependency_edges
            .iter()
            .map(|edge| edge.id.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    #[must_use]
    pub fn is_pure_containment(&self) -> bool {
        self.dependency_edges.is_empty()
    }

    /// Distinct endpoints of the dependency run, in first-seen order.
    #[must_use]
    pub fn dependency_endpoints(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.dependency_edges
            .iter()
            .flat_map(|edge| [edge.source.as_str(), edge.target.as_str()])
            .filter(|id| seen.insert(*id))
            .collect()
    }
}
