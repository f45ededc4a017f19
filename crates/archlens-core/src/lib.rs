#![forbid(unsafe_code)]
//! archlens-core library.
//!
//! Shared vocabulary for the archlens pipeline: the component/relationship
//! model, the raw path records produced by the external graph store, the
//! ordered-unique container every graph collection is built on, and the
//! project/user configuration.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` at I/O edges; stable codes via [`error::ErrorCode`].
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod collection;
pub mod config;
pub mod error;
pub mod model;
pub mod record;
pub mod source;

pub use collection::{IdMap, Keyed};
pub use model::{
    ComponentEdge, ComponentNode, DependencyCategory, Footprint, Graph, LayerKind,
    ViolationFlags,
};
pub use record::{NormalizedRecord, PathRecord, RawNode, RawRelationship};
pub use source::{GraphSource, JsonFileSource, Scope};
