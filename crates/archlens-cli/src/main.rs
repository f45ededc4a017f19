#![forbid(unsafe_code)]

mod cmd;
mod output;

use archlens_core::config::resolve_config;
use archlens_core::error::ErrorCode;
use archlens_engine::timing::StageTimings;
use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error};
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "archlens: depth-bounded architecture graphs with cycle and layer checks",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit per-stage timing report to stderr.
    #[arg(long, global = true)]
    timing: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format, overriding --json, FORMAT and the user config.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Analysis",
        about = "Build the visible dependency graph and report violations",
        long_about = "Normalize the exported path records, build the containment hierarchy, \
                      collapse nodes below --max-depth, filter by degree, and merge the result \
                      with the containment scope graph. Cycle and layer violations are flagged \
                      on the visible edges.",
        after_help = "EXAMPLES:\n    # Full graph around the export's selected node\n    archlens analyze -i export.json\n\n    # Collapse to layers, drop self edges, emit JSON\n    archlens analyze -i export.json --max-depth 2 --no-self-edges --json"
    )]
    Analyze(cmd::analyze::AnalyzeArgs),

    #[command(
        next_help_heading = "Analysis",
        about = "List dependency cycles in the visible graph",
        long_about = "Enumerate elementary cycles of the full dependency graph, or use the \
                      cycles delegated in the export, and map each onto the visible graph.",
        after_help = "EXAMPLES:\n    # Cycles between layers\n    archlens cycles -i export.json --max-depth 2\n\n    # Bound the search\n    archlens cycles -i export.json --max-cycles 100 --max-length 6"
    )]
    Cycles(cmd::cycles::CyclesArgs),

    #[command(
        next_help_heading = "Analysis",
        about = "List dependencies that break the layer order",
        long_about = "Check every dependency against the configured layer order (top first) \
                      and report the offending edges of the visible graph.",
        after_help = "EXAMPLES:\n    # Use [layers] from .archlens/config.toml\n    archlens layers -i export.json\n\n    # Give the order inline\n    archlens layers -i export.json --order presentation,domain,infrastructure"
    )]
    Layers(cmd::layers::LayersArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ARCHLENS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "archlens=debug,info"
        } else {
            "archlens=info,warn"
        })
    });

    let format = env::var("ARCHLENS_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn emit_timings(timings: &StageTimings) -> anyhow::Result<()> {
    if timings.is_empty() {
        eprintln!("timing report: no samples recorded");
    } else {
        eprintln!("timing report:");
        eprintln!("{}", timings.display_table());
        eprintln!("timing report (json):");
        eprintln!("{}", serde_json::to_string_pretty(&timings.to_json())?);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let config = resolve_config(&project_root, cli.json);
    if let Err(err) = &config {
        let mode = OutputMode::select(cli.format, if cli.json { "json" } else { "text" });
        render_error(mode, &CliError::from_code(ErrorCode::ConfigParseError, format!("{err:#}")))?;
    }
    let config = config?;
    let output = OutputMode::select(cli.format, &config.resolved_output);

    let timings = match cli.command {
        Commands::Analyze(ref args) => cmd::analyze::run_analyze(args, output, &config.project),
        Commands::Cycles(ref args) => cmd::cycles::run_cycles(args, output, &config.project),
        Commands::Layers(ref args) => cmd::layers::run_layers(args, output, &config.project),
    }?;

    if cli.timing {
        emit_timings(&timings)?;
    }
    Ok(())
}
