//! `archlens cycles`: dependency cycles as they appear in the visible graph.

use std::io::Write;

use archlens_core::Graph;
use archlens_core::config::ProjectConfig;
use archlens_core::error::ErrorCode;
use archlens_engine::timing::StageTimings;
use archlens_engine::{Analysis, CycleViolation, Diagnostic};
use clap::Args;
use serde::Serialize;

use super::{SourceArgs, load_and_analyze, write_diagnostics};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug, Default)]
pub struct CyclesArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Stop enumerating after this many elementary cycles.
    #[arg(long, value_name = "N")]
    pub max_cycles: Option<usize>,

    /// Longest cycle, in edges, the search follows.
    #[arg(long, value_name = "N")]
    pub max_length: Option<usize>,
}

/// One cycle: its edges and the node walk they trace.
#[derive(Debug, Serialize)]
pub struct CycleEntry {
    pub edge_ids: Vec<String>,
    pub path: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CyclesOutput {
    pub cycles: Vec<CycleEntry>,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl CyclesOutput {
    fn from_analysis(analysis: &Analysis) -> Self {
        let truncated_code = ErrorCode::CycleSearchTruncated.code();
        Self {
            cycles: analysis
                .report
                .cycles
                .iter()
                .map(|cycle| CycleEntry {
                    edge_ids: cycle.edge_ids.clone(),
                    path: node_walk(&analysis.graph, cycle),
                })
                .collect(),
            truncated: analysis
                .report
                .diagnostics
                .iter()
                .any(|d| d.code == truncated_code),
            diagnostics: analysis.report.diagnostics.clone(),
        }
    }
}

/// Source of each edge in order, closed with the first node again.
fn node_walk(graph: &Graph, cycle: &CycleViolation) -> Vec<String> {
    let mut path: Vec<String> = cycle
        .edge_ids
        .iter()
        .filter_map(|id| graph.edges.get(id))
        .map(|edge| edge.source.clone())
        .collect();
    if let Some(first) = path.first().cloned() {
        path.push(first);
    }
    path
}

pub fn run_cycles(
    args: &CyclesArgs,
    output: OutputMode,
    project: &ProjectConfig,
) -> anyhow::Result<StageTimings> {
    let mut project = project.clone();
    if let Some(max_cycles) = args.max_cycles {
        project.cycles.max_cycles = max_cycles;
    }
    if let Some(max_length) = args.max_length {
        project.cycles.max_depth = max_length;
    }

    let mut analysis = load_and_analyze(&args.source, &project, output)?;
    let payload = CyclesOutput::from_analysis(&analysis);
    render_mode(output, &payload, render_cycles_text, render_cycles_pretty)?;
    Ok(std::mem::take(&mut analysis.timings))
}

fn render_cycles_text(payload: &CyclesOutput, w: &mut dyn Write) -> std::io::Result<()> {
    if payload.cycles.is_empty() {
        writeln!(w, "no cycles")?;
    }
    for entry in &payload.cycles {
        writeln!(w, "cycle {} edges={}", entry.path.join(" -> "), entry.edge_ids.join(","))?;
    }
    if payload.truncated {
        writeln!(w, "truncated")?;
    }
    Ok(())
}

fn render_cycles_pretty(payload: &CyclesOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Dependency cycles")?;
    pretty_kv(w, "Cycles", payload.cycles.len().to_string())?;
    if payload.truncated {
        pretty_kv(w, "Search", "truncated (raise [cycles] limits to see more)")?;
    }

    if payload.cycles.is_empty() {
        writeln!(w)?;
        writeln!(w, "No cycles in the visible graph.")?;
    } else {
        for (i, entry) in payload.cycles.iter().enumerate() {
            writeln!(w)?;
            writeln!(w, "Cycle {} ({} edges)", i + 1, entry.edge_ids.len())?;
            writeln!(w, "  {}", entry.path.join(" -> "))?;
        }
    }

    write_diagnostics(w, &payload.diagnostics)
}
