//! The two deduplication passes.
//!
//! The approximate pass compares normalized name/artist pairs and runs
//! before catalog resolution to keep the number of searches down. It misses
//! duplicates whose names drift between the history source and the
//! catalog. The exact pass compares resolved provider identities and runs
//! after resolution; it is authoritative.

use std::collections::HashSet;

use crate::snapshot::Snapshot;
use crate::track::{Resolved, Track};

/// Keep candidates whose normalized identity is absent from the snapshot.
/// Repeats within `candidates` keep only their first occurrence.
pub fn filter_by_approximate_identity(
    candidates: &[Track],
    snapshot: &Snapshot,
    normalize: impl Fn(&str) -> String,
) -> Vec<Track> {
    let mut seen = snapshot.keys(&normalize);

    candidates
        .iter()
        .filter(|candidate| seen.insert(candidate.key_with(&normalize)))
        .cloned()
        .collect()
}

/// Keep resolved candidates whose provider identity is absent from the
/// snapshot. Repeats of an identity keep only their first occurrence.
pub fn filter_by_exact_identity(resolved: Vec<Resolved>, snapshot: &Snapshot) -> Vec<Resolved> {
    let existing = snapshot.provider_ids();
    let mut accepted = HashSet::new();

    resolved
        .into_iter()
        .filter(|r| !existing.contains(&r.id) && accepted.insert(r.id.clone()))
        .collect()
}
