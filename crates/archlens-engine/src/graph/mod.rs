//! Graph construction and transformation.
//!
//! # Overview
//!
//! ```text
//! PathRecord (raw chains)
//!        ↓  normalize::split_into_chunks / dedupe_longest_paths
//! NormalizedRecord
//!        ↓  hierarchy::Hierarchy::build
//! Hierarchy (containment forest, depths, footprints)
//!        ↓  processor::GraphProcessor::process
//! ProcessedGraph (visible graph + replacement map)
//!        ↓  merge::merge(scope::containment_graph, ...)
//! Graph
//! ```
//!
//! [`FullGraph`] is built beside this chain from the same normalized records
//! and feeds the cycle detector.

pub mod build;
pub mod hierarchy;
pub mod merge;
pub mod normalize;
pub mod processor;
pub mod scope;
pub mod stats;

#[cfg(test)]
pub(crate) mod fixtures;

pub use build::FullGraph;
pub use hierarchy::Hierarchy;
pub use merge::merge;
pub use processor::{Direction, GraphProcessor, ProcessedGraph, ReplacementMap};
pub use stats::GraphStats;
