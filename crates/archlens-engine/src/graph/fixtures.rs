//! Test builders for small containment trees and dependency records.

use archlens_core::{DependencyCategory, NormalizedRecord, PathRecord, RawNode, RawRelationship};

use super::hierarchy::Hierarchy;
use super::normalize::{dedupe_longest_paths, split_into_chunks};

pub const CONTAINS: &str = "CONTAINS";

/// One record per `(id, kind, parent)` entry. Parents must be listed first.
pub fn tree(entries: &[(&str, &str, Option<&str>)]) -> Vec<PathRecord> {
    let kind_of = |id: &str| {
        entries
            .iter()
            .find(|(candidate, _, _)| *candidate == id)
            .map_or("Module", |(_, kind, _)| *kind)
    };

    entries
        .iter()
        .map(|(id, kind, parent)| {
            let child = RawNode::new(*id, &[*kind]);
            match parent {
                Some(parent) => {
                    let mut record = PathRecord::new(
                        RawNode::new(*parent, &[kind_of(parent)]),
                        vec![RawRelationship::new(
                            format!("c:{parent}:{id}"),
                            CONTAINS,
                            *parent,
                            *id,
                        )],
                        child,
                    );
                    record.nodes = vec![record.source.clone(), record.target.clone()];
                    record
                }
                None => PathRecord::new(child.clone(), Vec::new(), child),
            }
        })
        .collect()
}

pub fn dep(id: &str, from: &str, to: &str, category: DependencyCategory) -> PathRecord {
    PathRecord::new(
        RawNode::new(from, &["Module"]),
        vec![RawRelationship::new(id, "DEPENDS_ON", from, to).with_category(category)],
        RawNode::new(to, &["Module"]),
    )
}

/// Normalize `raw` and build its hierarchy, the way the pipeline does.
pub fn build(raw: &[PathRecord]) -> (Hierarchy, Vec<NormalizedRecord>) {
    let normalized = dedupe_longest_paths(split_into_chunks(raw, CONTAINS));
    let hierarchy = Hierarchy::build(raw, &normalized, CONTAINS);
    (hierarchy, normalized)
}

/// Two domains' worth of layers and modules:
///
/// ```text
/// d ─ app ─ l1 ─ m1, m2
///         └ l2 ─ m3, m4
/// ```
pub fn layered_tree() -> Vec<PathRecord> {
    tree(&[
        ("d", "Domain", None),
        ("app", "Application", Some("d")),
        ("l1", "Layer", Some("app")),
        ("l2", "Layer", Some("app")),
        ("m1", "Module", Some("l1")),
        ("m2", "Module", Some("l1")),
        ("m3", "Module", Some("l2")),
        ("m4", "Module", Some("l2")),
    ])
}
