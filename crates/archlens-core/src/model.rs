//! Component graph model: nodes, relationships, violation flags, footprints.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::{fmt, str::FromStr};

use crate::collection::{IdMap, Keyed};

/// Architectural containment level, ordered from the root of the hierarchy
/// down to its leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    Domain,
    Application,
    Layer,
    Module,
}

impl LayerKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Domain => "Domain",
            Self::Application => "Application",
            Self::Layer => "Layer",
            Self::Module => "Module",
        }
    }

    /// Nominal containment depth of this kind (`Domain` = 0).
    #[must_use]
    pub const fn level(self) -> u32 {
        match self {
            Self::Domain => 0,
            Self::Application => 1,
            Self::Layer => 2,
            Self::Module => 3,
        }
    }

    /// Pick the kind from a store label set. The most general matching
    /// label wins; nodes carrying no known label are treated as modules.
    #[must_use]
    pub fn from_labels(labels: &[String]) -> Self {
        labels
            .iter()
            .filter_map(|label| label.parse::<Self>().ok())
            .min()
            .unwrap_or(Self::Module)
    }
}

/// Category carried by a dependency relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyCategory {
    Weak,
    Strong,
    Entity,
}

impl DependencyCategory {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Strong => "strong",
            Self::Entity => "entity",
        }
    }

    /// Footprint slot counting outgoing dependencies of this category.
    #[must_use]
    pub const fn footprint_slot(self) -> usize {
        match self {
            Self::Weak => Footprint::WEAK,
            Self::Strong => Footprint::STRONG,
            Self::Entity => Footprint::ENTITY,
        }
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DependencyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

impl FromStr for LayerKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "domain" => Ok(Self::Domain),
            "application" => Ok(Self::Application),
            "layer" => Ok(Self::Layer),
            "module" => Ok(Self::Module),
            _ => Err(ParseEnumError {
                expected: "layer kind",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for DependencyCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "weak" => Ok(Self::Weak),
            "strong" => Ok(Self::Strong),
            "entity" => Ok(Self::Entity),
            _ => Err(ParseEnumError {
                expected: "dependency category",
                got: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Footprint
// ---------------------------------------------------------------------------

/// Four-slot dependency footprint, rolled up bottom-up over the hierarchy.
///
/// Slot layout: outgoing weak, outgoing strong, outgoing entity, incoming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint(pub [u64; 4]);

impl Footprint {
    pub const WEAK: usize = 0;
    pub const STRONG: usize = 1;
    pub const ENTITY: usize = 2;
    pub const INCOMING: usize = 3;

    #[must_use]
    pub const fn zero() -> Self {
        Self([0; 4])
    }

    #[must_use]
    pub fn slot(&self, index: usize) -> u64 {
        self.0.get(index).copied().unwrap_or_default()
    }

    pub fn bump(&mut self, index: usize) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot += 1;
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }
}

impl AddAssign for Footprint {
    fn add_assign(&mut self, rhs: Self) {
        for (slot, value) in self.0.iter_mut().zip(rhs.0) {
            *slot += value;
        }
    }
}

impl fmt::Display for Footprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [weak, strong, entity, incoming] = self.0;
        write!(f, "w{weak}/s{strong}/e{entity}/in{incoming}")
    }
}

// ---------------------------------------------------------------------------
// Violation flags
// ---------------------------------------------------------------------------

/// Violation markers present on every edge (both default to `false`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViolationFlags {
    /// The edge participates in at least one dependency cycle.
    pub cycle: bool,
    /// The edge breaks the allowed layering direction.
    pub layer: bool,
}

impl ViolationFlags {
    /// Fold another edge's flags into these (logical OR).
    pub fn absorb(&mut self, other: Self) {
        self.cycle |= other.cycle;
        self.layer |= other.layer;
    }

    #[must_use]
    pub const fn any(self) -> bool {
        self.cycle || self.layer
    }
}

// ---------------------------------------------------------------------------
// Nodes and edges
// ---------------------------------------------------------------------------

/// A domain, application, layer, or module in the containment forest.
///
/// `parent` and `children` are id references into the owning [`IdMap`];
/// the map is the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentNode {
    pub id: String,
    pub name: String,
    pub kind: LayerKind,
    pub depth: u32,
    /// Architectural layer name, when the store provides one directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub footprint: Footprint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    /// Remaining store properties, passed through untouched.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ComponentNode {
    /// Minimal node used by tests and synthetic graphs.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: LayerKind, depth: u32) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            depth,
            layer: None,
            color: None,
            footprint: Footprint::zero(),
            parent: None,
            children: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl Keyed for ComponentNode {
    fn key(&self) -> &str {
        &self.id
    }
}

/// A containment or dependency relationship between two components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    /// Sorted, deduplicated categories; empty for containment edges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<DependencyCategory>,
    #[serde(default)]
    pub violations: ViolationFlags,
}

impl ComponentEdge {
    #[must_use]
    pub fn dependency(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        category: Option<DependencyCategory>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            rel_type: "DEPENDS_ON".to_string(),
            categories: category.into_iter().collect(),
            violations: ViolationFlags::default(),
        }
    }

    #[must_use]
    pub fn containment(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        label: &str,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            rel_type: label.to_string(),
            categories: Vec::new(),
            violations: ViolationFlags::default(),
        }
    }

    #[must_use]
    pub fn is_containment(&self, label: &str) -> bool {
        self.rel_type == label
    }

    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// Merge another edge's categories and violation flags into this one.
    pub fn absorb(&mut self, other: &Self) {
        for category in &other.categories {
            if let Err(pos) = self.categories.binary_search(category) {
                self.categories.insert(pos, *category);
            }
        }
        self.violations.absorb(other.violations);
    }
}

impl Keyed for ComponentEdge {
    fn key(&self) -> &str {
        &self.id
    }
}

/// A node/edge graph built from ordered-unique collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: IdMap<ComponentNode>,
    pub edges: IdMap<ComponentEdge>,
}

impl Graph {
    #[must_use]
    pub fn new(nodes: IdMap<ComponentNode>, edges: IdMap<ComponentEdge>) -> Self {
        Self { nodes, edges }
    }

    /// Find the first edge running `source -> target`.
    #[must_use]
    pub fn edge_between(&self, source: &str, target: &str) -> Option<&ComponentEdge> {
        self.edges
            .iter()
            .find(|edge| edge.source == source && edge.target == target)
    }

    /// Return edges whose endpoints are missing from the node collection.
    #[must_use]
    pub fn dangling_edges(&self) -> Vec<&ComponentEdge> {
        self.edges
            .iter()
            .filter(|edge| {
                !self.nodes.contains_key(&edge.source) || !self.nodes.contains_key(&edge.target)
            })
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}
