//! `archlens layers`: dependencies that run against the configured layer order.

use std::io::Write;

use archlens_core::config::ProjectConfig;
use archlens_engine::timing::StageTimings;
use archlens_engine::{Diagnostic, LayerViolation};
use clap::Args;
use serde::Serialize;

use super::{SourceArgs, load_and_analyze, write_diagnostics};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug, Default)]
pub struct LayersArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Layer names, top first, replacing `[layers] order`.
    #[arg(long, value_name = "LAYER,...", value_delimiter = ',')]
    pub order: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LayersOutput {
    pub order: Vec<String>,
    pub violations: Vec<LayerViolation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

pub fn run_layers(
    args: &LayersArgs,
    output: OutputMode,
    project: &ProjectConfig,
) -> anyhow::Result<StageTimings> {
    let mut project = project.clone();
    if !args.order.is_empty() {
        project.layers.order.clone_from(&args.order);
    }

    let mut analysis = load_and_analyze(&args.source, &project, output)?;
    let payload = LayersOutput {
        order: project.layers.order,
        violations: std::mem::take(&mut analysis.report.layers),
        diagnostics: std::mem::take(&mut analysis.report.diagnostics),
    };
    render_mode(output, &payload, render_layers_text, render_layers_pretty)?;
    Ok(std::mem::take(&mut analysis.timings))
}

fn render_layers_text(payload: &LayersOutput, w: &mut dyn Write) -> std::io::Result<()> {
    if payload.order.is_empty() {
        writeln!(w, "no layer order configured")?;
        return Ok(());
    }
    if payload.violations.is_empty() {
        writeln!(w, "no layer violations")?;
    }
    for v in &payload.violations {
        writeln!(
            w,
            "violation {} {} ({}) -> {} ({})",
            v.edge_id, v.source, v.source_layer, v.target, v.target_layer
        )?;
    }
    Ok(())
}

fn render_layers_pretty(payload: &LayersOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Layer violations")?;
    if payload.order.is_empty() {
        writeln!(w, "No layer order configured.")?;
        writeln!(w, "Set [layers] order in .archlens/config.toml or pass --order.")?;
        return Ok(());
    }
    pretty_kv(w, "Order", payload.order.join(" > "))?;
    pretty_kv(w, "Violations", payload.violations.len().to_string())?;

    if !payload.violations.is_empty() {
        writeln!(w)?;
        writeln!(w, "{:<20} {:<20} {:<12} {:<12} EDGE", "FROM", "TO", "FROM LAYER", "TO LAYER")?;
        for v in &payload.violations {
            writeln!(
                w,
                "{:<20} {:<20} {:<12} {:<12} {}",
                v.source, v.target, v.source_layer, v.target_layer, v.edge_id
            )?;
        }
    }

    write_diagnostics(w, &payload.diagnostics)
}
