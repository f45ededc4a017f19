//! End-to-end analysis for one scope.
//!
//! [`analyze`] pulls raw records from a [`GraphSource`], builds the
//! hierarchy, runs both violation detectors on the full record set, produces
//! the visible graph, and composes it with the containment scope graph.
//! Source failures propagate unchanged; tolerated input problems become
//! [`Diagnostic`]s on the report.

use anyhow::Result;
use archlens_core::config::ProjectConfig;
use archlens_core::error::ErrorCode;
use archlens_core::{Graph, GraphSource, PathRecord, Scope};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::diagnostic::Diagnostic;
use crate::graph::normalize::{dedupe_longest_paths, split_into_chunks};
use crate::graph::scope::{containment_graph, restrict_to_visible};
use crate::graph::{FullGraph, GraphProcessor, GraphStats, Hierarchy, ReplacementMap, merge};
use crate::timing::StageTimings;
use crate::violations::cycles::{
    cycles_from_relationships, find_cycles, flag_cycle_edges, map_cycles_to_visible_graph,
};
use crate::violations::layers::{
    LayerRules, extract_violations, flag_layer_edges, map_layer_violations_to_visible_graph,
    mark_violations,
};
use crate::violations::ViolationReport;

/// Conditions that abort an analysis.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("selected node '{0}' is not in the retrieved records")]
    UnknownSelectedNode(String),
    #[error("{0} retrieval panicked")]
    RetrievalPanicked(&'static str),
}

impl AnalysisError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownSelectedNode(_) => ErrorCode::NodeNotFound,
            Self::RetrievalPanicked(_) => ErrorCode::InternalUnexpected,
        }
    }
}

/// Result of one analysis.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    /// Visible dependency graph merged with the containment scope graph.
    pub graph: Graph,
    pub report: ViolationReport,
    /// Statistics of the visible dependency graph, before the merge.
    pub stats: GraphStats,
    /// BLAKE3 hash of the full pre-abstraction dependency edge set.
    pub content_hash: String,
    pub replacement: ReplacementMap,
    #[serde(skip)]
    pub timings: StageTimings,
}

/// Run the whole pipeline for `scope`.
///
/// # Errors
///
/// Returns the source's error when retrieval fails, and
/// [`AnalysisError::UnknownSelectedNode`] when the selected node is absent
/// from non-empty input.
#[instrument(skip_all, fields(selected = ?scope.selected))]
pub fn analyze(source: &dyn GraphSource, scope: &Scope, config: &ProjectConfig) -> Result<Analysis> {
    let mut timings = StageTimings::default();
    let mut diagnostics = Vec::new();
    let label = config.processor.containment_label.as_str();

    let dependency_paths = timings.timed("retrieve.dependencies", || source.dependency_paths(scope))?;
    let (parent_chain, child_chain) =
        timings.timed("retrieve.containment", || fetch_containment(source, scope))?;

    let dependency_count = dependency_paths.len();
    let mut records = dependency_paths;
    records.extend(parent_chain);
    records.extend(child_chain);
    debug!(
        dependency = dependency_count,
        containment = records.len() - dependency_count,
        "records retrieved"
    );

    let mut normalized = timings.timed("normalize", || {
        dedupe_longest_paths(split_into_chunks(&records[..dependency_count], label))
    });
    let hierarchy = timings.timed("hierarchy", || Hierarchy::build(&records, &normalized, label));
    if hierarchy.skipped_relationships > 0 {
        warn!(
            skipped = hierarchy.skipped_relationships,
            "containment relationships skipped"
        );
        diagnostics.push(Diagnostic::new(
            ErrorCode::MalformedRelationship,
            format!(
                "{} containment relationship(s) skipped while linking the hierarchy",
                hierarchy.skipped_relationships
            ),
        ));
    }

    if let Some(selected) = scope
        .selected
        .as_deref()
        .filter(|id| !hierarchy.is_empty() && !hierarchy.contains(id))
    {
        return Err(AnalysisError::UnknownSelectedNode(selected.to_string()).into());
    }

    let raw_layer_violations = match LayerRules::from_policy(&config.layers) {
        Some(rules) => timings.timed("layers.mark", || {
            mark_violations(&mut normalized, &hierarchy, &rules);
            extract_violations(&normalized, &hierarchy)
        }),
        None => Vec::new(),
    };

    let full = timings.timed("full_graph", || FullGraph::from_records(&normalized));
    let mut processed = timings.timed("process", || {
        GraphProcessor::new(&hierarchy, &config.processor)
            .with_selected(scope.selected.as_deref())
            .process(&normalized)
    });
    if !processed.replacement.unmapped.is_empty() {
        warn!(
            unmapped = processed.replacement.unmapped.len(),
            "nodes without an ancestor at the abstraction depth"
        );
        diagnostics.push(Diagnostic::new(
            ErrorCode::AncestorMissing,
            format!(
                "{} node(s) have no ancestor at depth {}",
                processed.replacement.unmapped.len(),
                config.processor.max_depth.unwrap_or_default()
            ),
        ));
    }

    let raw_cycles = match timings.timed("retrieve.cycles", || source.cycles(scope))? {
        Some(delegated) => {
            debug!(cycles = delegated.len(), "using cycles reported by the source");
            cycles_from_relationships(delegated)
        }
        None => {
            let search = timings.timed("cycles.search", || find_cycles(&full, config.cycles));
            if search.truncated {
                diagnostics.push(Diagnostic::new(
                    ErrorCode::CycleSearchTruncated,
                    format!("cycle search stopped after {search}"),
                ));
            }
            search.cycles
        }
    };

    let report = timings.timed("violations.remap", || {
        let cycles = map_cycles_to_visible_graph(&raw_cycles, &processed, &hierarchy);
        let layers =
            map_layer_violations_to_visible_graph(&raw_layer_violations, &processed, &hierarchy);
        ViolationReport {
            cycles,
            layers,
            diagnostics,
        }
    });
    flag_cycle_edges(&mut processed.graph, &report.cycles);
    flag_layer_edges(&mut processed.graph, &report.layers);

    let stats = GraphStats::from_graph(&processed.graph);
    let mut scope_graph = containment_graph(
        &records[dependency_count..],
        &hierarchy,
        label,
        config.processor.max_depth,
    );
    if !(config.processor.outgoing.is_unbounded() && config.processor.incoming.is_unbounded()) {
        restrict_to_visible(
            &mut scope_graph,
            &processed.graph,
            &hierarchy,
            scope.selected.as_deref(),
        );
    }
    let replacement = std::mem::take(&mut processed.replacement);
    let graph = timings.timed("merge", || merge([scope_graph, processed.into_graph()]));

    info!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        cycles = report.cycles.len(),
        layer_violations = report.layers.len(),
        "analysis complete"
    );

    Ok(Analysis {
        graph,
        report,
        stats,
        content_hash: full.content_hash,
        replacement,
        timings,
    })
}

/// Fetch the parent and child chains concurrently.
fn fetch_containment(
    source: &dyn GraphSource,
    scope: &Scope,
) -> Result<(Vec<PathRecord>, Vec<PathRecord>)> {
    std::thread::scope(|threads| {
        let parents = threads.spawn(|| source.parent_chain(scope));
        let children = threads.spawn(|| source.child_chain(scope));
        let parents = parents
            .join()
            .map_err(|_| AnalysisError::RetrievalPanicked("parent chain"))?;
        let children = children
            .join()
            .map_err(|_| AnalysisError::RetrievalPanicked("child chain"))?;
        Ok((parents?, children?))
    })
}
