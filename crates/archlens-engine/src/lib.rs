#![forbid(unsafe_code)]
//! archlens-engine library.
//!
//! Turns raw path records into a depth-bounded, deduplicated architecture
//! graph plus cycle and layering violation reports.
//!
//! ```text
//! GraphSource (dependency paths, parent/child chains, optional cycles)
//!        ↓  graph::normalize   split runs, keep deepest variant per sequence
//!        ↓  graph::hierarchy   nodes, parent/child links, footprint rollup
//!        ↓  violations::layers mark layer violations on the full record set
//!        ↓  graph::processor   abstraction, range filter, merge, prune, project
//!        ↓  violations::cycles elementary cycles on the full graph, remapped
//!        ↓  graph::merge       compose with the containment scope graph
//! Analysis (graph, violation report, stats, timings)
//! ```
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types; `AnalysisError` for
//!   conditions callers branch on.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod diagnostic;
pub mod graph;
pub mod pipeline;
pub mod timing;
pub mod violations;

pub use diagnostic::Diagnostic;
pub use graph::{FullGraph, GraphProcessor, GraphStats, Hierarchy, ProcessedGraph, ReplacementMap};
pub use pipeline::{Analysis, AnalysisError, analyze};
pub use violations::{CycleViolation, LayerViolation, ViolationReport};
