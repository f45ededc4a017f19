//! Layer-direction violations.
//!
//! A dependency edge is judged on the full record set by the architectural
//! layers of its two endpoints. Layers are ranked by the configured order,
//! top first; depending on the same layer or on a lower one is allowed, as is
//! any pair listed under `allow`. Edges whose endpoints have no known layer,
//! or a layer missing from the order, are not judged.
//!
//! Flags are written into the normalized records before processing, so merged
//! visible edges inherit them. The report itself is remapped onto visible
//! edges separately.

use std::collections::{HashMap, HashSet};

use archlens_core::{Graph, NormalizedRecord};
use archlens_core::config::LayerPolicy;
use tracing::{debug, instrument};

use super::LayerViolation;
use super::remap::rewrite_endpoints;
use crate::graph::{Hierarchy, ProcessedGraph};

/// Compiled form of a [`LayerPolicy`]. Names compare case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct LayerRules {
    rank: HashMap<String, usize>,
    allowed: HashSet<(String, String)>,
}

impl LayerRules {
    /// `None` when the policy defines no order.
    #[must_use]
    pub fn from_policy(policy: &LayerPolicy) -> Option<Self> {
        if !policy.is_enabled() {
            return None;
        }
        let mut rank = HashMap::new();
        for (pos, name) in policy.order.iter().enumerate() {
            rank.entry(name.to_lowercase()).or_insert(pos);
        }
        let allowed = policy
            .allow
            .iter()
            .map(|rule| (rule.from.to_lowercase(), rule.to.to_lowercase()))
            .collect();
        Some(Self { rank, allowed })
    }

    /// Whether a dependency from layer `from` to layer `to` is allowed.
    #[must_use]
    pub fn permits(&self, from: &str, to: &str) -> bool {
        let from = from.to_lowercase();
        let to = to.to_lowercase();
        if from == to || self.allowed.contains(&(from.clone(), to.clone())) {
            return true;
        }
        match (self.rank.get(&from), self.rank.get(&to)) {
            (Some(source), Some(target)) => target >= source,
            _ => true,
        }
    }
}

/// Flag every dependency edge in `records` that breaks `rules`. Returns the
/// number of distinct edges flagged.
#[instrument(skip_all, fields(records = records.len()))]
pub fn mark_violations(
    records: &mut [NormalizedRecord],
    hierarchy: &Hierarchy,
    rules: &LayerRules,
) -> usize {
    let mut flagged: HashSet<String> = HashSet::new();
    for edge in records
        .iter_mut()
        .flat_map(|record| record.dependency_edges.iter_mut())
    {
        let (Some(from), Some(to)) = (
            hierarchy.architectural_layer(&edge.source),
            hierarchy.architectural_layer(&edge.target),
        ) else {
            continue;
        };
        if !rules.permits(from, to) {
            edge.violations.layer = true;
            flagged.insert(edge.id.clone());
        }
    }
    debug!(flagged = flagged.len(), "layer rules applied");
    flagged.len()
}

/// One entry per flagged dependency edge, in pre-abstraction ids.
#[must_use]
pub fn extract_violations(records: &[NormalizedRecord], hierarchy: &Hierarchy) -> Vec<LayerViolation> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut violations = Vec::new();
    for edge in records
        .iter()
        .flat_map(|record| &record.dependency_edges)
        .filter(|edge| edge.violations.layer)
    {
        if !seen.insert(edge.id.as_str()) {
            continue;
        }
        violations.push(LayerViolation {
            edge_id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            source_layer: layer_name(hierarchy, &edge.source),
            target_layer: layer_name(hierarchy, &edge.target),
        });
    }
    violations
}

fn layer_name(hierarchy: &Hierarchy, id: &str) -> String {
    hierarchy.architectural_layer(id).unwrap_or_default().to_string()
}

/// Rewrite violations onto visible edges, keeping the first violation per
/// visible edge. Violations whose edge was pruned are dropped.
#[must_use]
pub fn map_layer_violations_to_visible_graph(
    violations: &[LayerViolation],
    processed: &ProcessedGraph,
    hierarchy: &Hierarchy,
) -> Vec<LayerViolation> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut mapped = Vec::new();
    for violation in violations {
        let Some((source, target)) =
            rewrite_endpoints(&violation.source, &violation.target, processed, hierarchy)
        else {
            continue;
        };
        let Some(edge_id) = processed.edge_id_between(source, target) else {
            continue;
        };
        if !seen.insert(edge_id) {
            continue;
        }
        mapped.push(LayerViolation {
            edge_id: edge_id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            source_layer: violation.source_layer.clone(),
            target_layer: violation.target_layer.clone(),
        });
    }
    mapped
}

/// Set the layer flag on every visible edge a mapped violation names, even
/// when none of the edges merged into it was flagged before abstraction.
pub fn flag_layer_edges(graph: &mut Graph, violations: &[LayerViolation]) {
    for violation in violations {
        if let Some(edge) = graph.edges.get_mut(&violation.edge_id) {
            edge.violations.layer = true;
        }
    }
}
