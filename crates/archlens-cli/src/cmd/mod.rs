//! Subcommand handlers and the input/processing flags they share.

pub mod analyze;
pub mod cycles;
pub mod layers;

use std::io::Write;
use std::path::PathBuf;

use archlens_core::config::{DegreeRange, ProcessorConfig, ProjectConfig};
use archlens_core::error::ErrorCode;
use archlens_core::{JsonFileSource, Scope};
use archlens_engine::{Analysis, AnalysisError, Diagnostic, analyze};
use clap::Args;
use tracing::debug;

use crate::output::{CliError, OutputMode, pretty_section, render_error};

/// Flags selecting the input export and shaping the visible graph.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// JSON export of path records retrieved from the graph store.
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Collapse every node deeper than this onto its ancestor at this depth.
    #[arg(long, value_name = "N")]
    pub max_depth: Option<u32>,

    /// Node to centre the analysis on (defaults to the export's `selected`).
    #[arg(long, value_name = "ID")]
    pub select: Option<String>,

    /// Keep nodes with at least this many distinct outgoing neighbours.
    #[arg(long, value_name = "N")]
    pub outgoing_min: Option<usize>,

    /// Keep nodes with at most this many distinct outgoing neighbours.
    #[arg(long, value_name = "N")]
    pub outgoing_max: Option<usize>,

    /// Keep nodes with at least this many distinct incoming neighbours.
    #[arg(long, value_name = "N")]
    pub incoming_min: Option<usize>,

    /// Keep nodes with at most this many distinct incoming neighbours.
    #[arg(long, value_name = "N")]
    pub incoming_max: Option<usize>,

    /// Drop edges whose source and target coincide after abstraction.
    #[arg(long)]
    pub no_self_edges: bool,
}

impl SourceArgs {
    /// Layer command-line overrides on top of the project's processor config.
    pub fn apply(&self, config: &mut ProcessorConfig) {
        if self.max_depth.is_some() {
            config.max_depth = self.max_depth;
        }
        config.outgoing = DegreeRange::new(
            self.outgoing_min.or(config.outgoing.min),
            self.outgoing_max.or(config.outgoing.max),
        );
        config.incoming = DegreeRange::new(
            self.incoming_min.or(config.incoming.min),
            self.incoming_max.or(config.incoming.max),
        );
        if self.no_self_edges {
            config.include_self_edges = false;
        }
    }
}

/// Load the export named by `args` and run the full analysis.
///
/// Failures are rendered in `output` mode before being returned.
pub fn load_and_analyze(
    args: &SourceArgs,
    project: &ProjectConfig,
    output: OutputMode,
) -> anyhow::Result<Analysis> {
    if !args.input.exists() {
        let message = format!("input export not found: {}", args.input.display());
        render_error(output, &CliError::from_code(ErrorCode::InputNotFound, &message))?;
        anyhow::bail!(message);
    }

    let source = JsonFileSource::from_path(&args.input);
    if let Err(err) = &source {
        render_error(output, &CliError::from_code(ErrorCode::InputParseError, format!("{err:#}")))?;
    }
    let source = source?;

    let scope = Scope {
        selected: args
            .select
            .clone()
            .or_else(|| source.selected().map(str::to_string)),
    };
    let mut config = project.clone();
    args.apply(&mut config.processor);
    debug!(?scope.selected, ?config.processor, "running analysis");

    let result = analyze(&source, &scope, &config);
    if let Err(err) = &result {
        let code = err
            .downcast_ref::<AnalysisError>()
            .map_or(ErrorCode::SourceUnavailable, AnalysisError::code);
        render_error(output, &CliError::from_code(code, format!("{err:#}")))?;
    }
    result
}

/// Pretty trailer listing tolerated problems; prints nothing when there are none.
pub fn write_diagnostics(w: &mut dyn Write, diagnostics: &[Diagnostic]) -> std::io::Result<()> {
    if diagnostics.is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    pretty_section(w, "Diagnostics")?;
    for diagnostic in diagnostics {
        writeln!(w, "{diagnostic}")?;
        if let Some(hint) = diagnostic.hint {
            writeln!(w, "  hint: {hint}")?;
        }
    }
    Ok(())
}
