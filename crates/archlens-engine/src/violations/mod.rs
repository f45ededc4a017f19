//! Cycle and layer violation detection.
//!
//! Both detectors run on pre-abstraction data and report in terms of the
//! visible graph; see [`remap`].

pub mod cycles;
pub mod layers;
pub mod remap;

use serde::Serialize;

use crate::diagnostic::Diagnostic;

pub use cycles::{CycleSearch, find_cycles, flag_cycle_edges, map_cycles_to_visible_graph};
pub use layers::{
    LayerRules, extract_violations, flag_layer_edges, map_layer_violations_to_visible_graph,
    mark_violations,
};
pub use remap::remap_to_visible_graph;

/// An elementary dependency cycle as an ordered list of visible edge ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleViolation {
    pub edge_ids: Vec<String>,
}

/// A dependency edge running against the allowed layer direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerViolation {
    pub edge_id: String,
    pub source: String,
    pub target: String,
    pub source_layer: String,
    pub target_layer: String,
}

/// Everything the detectors found, plus tolerated problems.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViolationReport {
    pub cycles: Vec<CycleViolation>,
    pub layers: Vec<LayerViolation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl ViolationReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.cycles.is_empty() && self.layers.is_empty()
    }
}
