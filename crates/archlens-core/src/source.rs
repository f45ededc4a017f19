//! Input retrieval interface.
//!
//! The pipeline never builds or runs store queries. It asks a [`GraphSource`]
//! for already-resolved path records for a scope:
//!
//! - `dependency_paths`: the dependency subgraph of the scope
//! - `parent_chain` / `child_chain`: containment paths above and below the
//!   selected node (independent, fetched concurrently by the pipeline)
//! - `cycles`: cycles the store computed itself, if it can
//!
//! [`JsonFileSource`] serves all four from a JSON export on disk.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::record::{PathRecord, RawRelationship};

/// What part of the architecture an invocation looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    /// Node the view is centred on; `None` for the whole export.
    pub selected: Option<String>,
}

impl Scope {
    #[must_use]
    pub fn selected(id: impl Into<String>) -> Self {
        Self {
            selected: Some(id.into()),
        }
    }
}

/// Provider of raw path records.
///
/// Implementations must be shareable across threads: the containment chains
/// are requested from two threads at once.
pub trait GraphSource: Send + Sync {
    /// Dependency paths for the scope.
    ///
    /// # Errors
    ///
    /// Any failure to reach the store; the pipeline surfaces it unchanged.
    fn dependency_paths(&self, scope: &Scope) -> Result<Vec<PathRecord>>;

    /// Containment paths from the roots down to the selected node.
    ///
    /// # Errors
    ///
    /// Any failure to reach the store.
    fn parent_chain(&self, scope: &Scope) -> Result<Vec<PathRecord>>;

    /// Containment paths from the selected node down to its descendants.
    ///
    /// # Errors
    ///
    /// Any failure to reach the store.
    fn child_chain(&self, scope: &Scope) -> Result<Vec<PathRecord>>;

    /// Cycles found by the store's own traversal, as ordered relationship
    /// chains. `None` means the store cannot compute them and the in-memory
    /// search should run instead.
    ///
    /// # Errors
    ///
    /// Any failure to reach the store.
    fn cycles(&self, _scope: &Scope) -> Result<Option<Vec<Vec<RawRelationship>>>> {
        Ok(None)
    }
}

/// On-disk shape of a store export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceExport {
    /// Node the export was taken around.
    #[serde(default)]
    pub selected: Option<String>,
    #[serde(default)]
    pub dependency_paths: Vec<PathRecord>,
    #[serde(default)]
    pub parent_chain: Vec<PathRecord>,
    #[serde(default)]
    pub child_chain: Vec<PathRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycles: Option<Vec<Vec<RawRelationship>>>,
}

/// A [`GraphSource`] backed by a JSON export.
///
/// The export is already scoped, so every request returns the stored records
/// regardless of the scope passed in.
#[derive(Debug, Clone, Default)]
pub struct JsonFileSource {
    export: SourceExport,
}

impl JsonFileSource {
    /// Load an export from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid export.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let export: SourceExport = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            dependency_paths = export.dependency_paths.len(),
            parent_chain = export.parent_chain.len(),
            child_chain = export.child_chain.len(),
            "loaded graph export"
        );
        Ok(Self { export })
    }

    #[must_use]
    pub const fn from_export(export: SourceExport) -> Self {
        Self { export }
    }

    /// The node the export was taken around, if recorded.
    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.export.selected.as_deref()
    }
}

impl GraphSource for JsonFileSource {
    fn dependency_paths(&self, _scope: &Scope) -> Result<Vec<PathRecord>> {
        Ok(self.export.dependency_paths.clone())
    }

    fn parent_chain(&self, _scope: &Scope) -> Result<Vec<PathRecord>> {
        Ok(self.export.parent_chain.clone())
    }

    fn child_chain(&self, _scope: &Scope) -> Result<Vec<PathRecord>> {
        Ok(self.export.child_chain.clone())
    }

    fn cycles(&self, _scope: &Scope) -> Result<Option<Vec<Vec<RawRelationship>>>> {
        Ok(self.export.cycles.clone())
    }
}
