//! `archlens analyze`: the depth-bounded dependency view with its violations.

use std::io::Write;

use archlens_core::config::ProjectConfig;
use archlens_engine::Analysis;
use archlens_engine::timing::StageTimings;
use clap::Args;

use super::{SourceArgs, load_and_analyze, write_diagnostics};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug, Default)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Omit node and edge listings from human output.
    #[arg(long)]
    pub summary: bool,
}

pub fn run_analyze(
    args: &AnalyzeArgs,
    output: OutputMode,
    project: &ProjectConfig,
) -> anyhow::Result<StageTimings> {
    let mut analysis = load_and_analyze(&args.source, project, output)?;
    let summary = args.summary;
    render_mode(
        output,
        &analysis,
        |a, w| render_analysis_text(a, summary, w),
        |a, w| render_analysis_pretty(a, summary, w),
    )?;
    Ok(std::mem::take(&mut analysis.timings))
}

fn render_analysis_text(
    analysis: &Analysis,
    summary: bool,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    let stats = &analysis.stats;
    writeln!(w, "hash {}", analysis.content_hash)?;
    writeln!(
        w,
        "nodes={} edges={} cycles={} layer_violations={}",
        analysis.graph.nodes.len(),
        analysis.graph.edges.len(),
        analysis.report.cycles.len(),
        analysis.report.layers.len(),
    )?;
    writeln!(
        w,
        "dependency_nodes={} dependency_edges={} density={:.4} components={}",
        stats.node_count, stats.edge_count, stats.density, stats.weakly_connected_component_count,
    )?;

    if !summary {
        for node in &analysis.graph.nodes {
            writeln!(
                w,
                "node {} {} depth={} parent={}",
                node.id,
                node.kind,
                node.depth,
                node.parent.as_deref().unwrap_or("-"),
            )?;
        }
        for edge in &analysis.graph.edges {
            writeln!(
                w,
                "edge {} {} -> {} {}{}",
                edge.id,
                edge.source,
                edge.target,
                edge.rel_type,
                edge_flags(edge.violations.cycle, edge.violations.layer),
            )?;
        }
    }

    for diagnostic in &analysis.report.diagnostics {
        writeln!(w, "diagnostic {diagnostic}")?;
    }
    Ok(())
}

fn render_analysis_pretty(
    analysis: &Analysis,
    summary: bool,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    let stats = &analysis.stats;
    pretty_section(w, "Analysis")?;
    pretty_kv(w, "Hash", &analysis.content_hash)?;
    pretty_kv(w, "Nodes", analysis.graph.nodes.len().to_string())?;
    pretty_kv(w, "Edges", analysis.graph.edges.len().to_string())?;
    pretty_kv(w, "Density", format!("{:.4}", stats.density))?;
    pretty_kv(w, "Components", stats.weakly_connected_component_count.to_string())?;
    pretty_kv(w, "Isolated", stats.isolated_node_count.to_string())?;
    pretty_kv(w, "Max in/out", format!("{}/{}", stats.max_in_degree, stats.max_out_degree))?;
    pretty_kv(w, "Collapsed", analysis.replacement.len().to_string())?;

    writeln!(w)?;
    pretty_section(w, "Violations")?;
    if analysis.report.is_clean() {
        writeln!(w, "No cycle or layer violations.")?;
    } else {
        pretty_kv(w, "Cycles", analysis.report.cycles.len().to_string())?;
        pretty_kv(w, "Cycle edges", stats.cycle_edge_count.to_string())?;
        pretty_kv(w, "Layer edges", analysis.report.layers.len().to_string())?;
    }

    if !summary && !analysis.graph.nodes.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Nodes")?;
        for node in &analysis.graph.nodes {
            let indent = "  ".repeat(usize::try_from(node.depth).unwrap_or(0));
            writeln!(w, "{indent}{} ({}, {})", node.name, node.kind, node.id)?;
        }

        writeln!(w)?;
        pretty_section(w, "Edges")?;
        for edge in &analysis.graph.edges {
            writeln!(
                w,
                "{:<24} -> {:<24} {}{}",
                edge.source,
                edge.target,
                edge.rel_type,
                edge_flags(edge.violations.cycle, edge.violations.layer),
            )?;
        }
    }

    write_diagnostics(w, &analysis.report.diagnostics)
}

fn edge_flags(cycle: bool, layer: bool) -> &'static str {
    match (cycle, layer) {
        (true, true) => " [cycle,layer]",
        (true, false) => " [cycle]",
        (false, true) => " [layer]",
        (false, false) => "",
    }
}
