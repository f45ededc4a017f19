//! Path normalization.
//!
//! # Overview
//!
//! A raw path mixes containment and dependency relationships, e.g.
//!
//! ```text
//! domain -CONTAINS-> layer -CONTAINS-> m1 -DEPENDS_ON-> m2 <-CONTAINS- layer2
//! ```
//!
//! [`split_into_chunks`] cuts the chain into maximal runs of one relationship
//! kind and keeps the leading containment run, the dependency run, and the
//! trailing containment run (reversed so it reads ancestor first).
//!
//! A variable-length upstream query returns the same dependency sequence at
//! several containment depths. [`dedupe_longest_paths`] keeps only the deepest
//! variant per sequence so per-node counts do not double up.

use std::collections::{HashMap, HashSet};

use archlens_core::{ComponentEdge, NormalizedRecord, PathRecord, RawRelationship};
use tracing::{debug, instrument, trace};

/// Split every raw path into homogeneous relationship runs.
#[instrument(skip(records), fields(records = records.len()))]
#[must_use]
pub fn split_into_chunks(records: &[PathRecord], containment_label: &str) -> Vec<NormalizedRecord> {
    records
        .iter()
        .map(|record| split_record(record, containment_label))
        .collect()
}

fn split_record(record: &PathRecord, containment_label: &str) -> NormalizedRecord {
    let runs = runs_of(&record.relationships, containment_label);
    let last = runs.len().saturating_sub(1);

    let mut contain_source_edges = Vec::new();
    let mut dependency_edges = Vec::new();
    let mut contain_target_edges = Vec::new();

    for (pos, (is_containment, run)) in runs.into_iter().enumerate() {
        if !is_containment {
            dependency_edges.extend(run.iter().map(|rel| rel.to_edge()));
        } else if pos == 0 {
            contain_source_edges = run.iter().map(|rel| rel.to_edge()).collect();
        } else if pos == last {
            contain_target_edges = run.iter().rev().map(|rel| rel.to_edge()).collect();
        } else {
            trace!(
                source = %record.source.element_id,
                dropped = run.len(),
                "containment run between dependency runs ignored"
            );
        }
    }

    let target_depth = contain_source_edges.len() + contain_target_edges.len();
    NormalizedRecord {
        source: record.source.element_id.clone(),
        target: record.target.element_id.clone(),
        contain_source_edges,
        dependency_edges,
        contain_target_edges,
        target_depth,
    }
}

/// Maximal runs of consecutive relationships sharing the same kind.
fn runs_of<'a>(
    relationships: &'a [RawRelationship],
    containment_label: &str,
) -> Vec<(bool, Vec<&'a RawRelationship>)> {
    let mut runs: Vec<(bool, Vec<&RawRelationship>)> = Vec::new();
    for rel in relationships {
        let is_containment = rel.is_containment(containment_label);
        match runs.last_mut() {
            Some((kind, run)) if *kind == is_containment => run.push(rel),
            _ => runs.push((is_containment, vec![rel])),
        }
    }
    runs
}

/// Keep, per dependency-edge sequence, only the records at the greatest
/// target depth. Pure containment records form their own group.
#[instrument(skip(records), fields(records = records.len()))]
#[must_use]
pub fn dedupe_longest_paths(records: Vec<NormalizedRecord>) -> Vec<NormalizedRecord> {
    let sequence_ids: Vec<String> = records.iter().map(NormalizedRecord::sequence_id).collect();

    let mut deepest: HashMap<&str, usize> = HashMap::new();
    for (record, sequence) in records.iter().zip(&sequence_ids) {
        let depth = deepest.entry(sequence.as_str()).or_insert(0);
        *depth = (*depth).max(record.target_depth);
    }

    let before = records.len();
    let kept: Vec<NormalizedRecord> = records
        .into_iter()
        .zip(&sequence_ids)
        .filter(|(record, sequence)| deepest.get(sequence.as_str()) == Some(&record.target_depth))
        .map(|(record, _)| record)
        .collect();

    debug!(before, after = kept.len(), "deduplicated path records");
    kept
}

/// Every dependency edge across `records`, first occurrence per id.
pub fn dependency_edges(records: &[NormalizedRecord]) -> impl Iterator<Item = &ComponentEdge> {
    let mut seen = HashSet::new();
    records
        .iter()
        .flat_map(|record| record.dependency_edges.iter())
        .filter(move |edge| seen.insert(edge.id.as_str()))
}
