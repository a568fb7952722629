use futures::future::join_all;

use crate::playlist::PlaylistProvider;
use crate::source::RemoteError;
use crate::sync::SyncError;
use crate::track::{Resolved, Track, TrackId};

/// Search the catalog for an exact name and artist and return the first
/// playable, non-local hit.
pub async fn resolve_identity(
    provider: &dyn PlaylistProvider,
    candidate: &Track,
) -> Result<Option<TrackId>, RemoteError> {
    let hits = provider.search(&candidate.name, &candidate.artist).await?;

    Ok(hits
        .into_iter()
        .find(|hit| hit.is_acceptable())
        .map(|hit| hit.id))
}

/// Resolve candidates in sequential batches of `batch_size`, each batch
/// searched concurrently.
///
/// Every search in a batch settles before the batch is inspected. The first
/// failure in a batch aborts the remaining batches. Candidates with no
/// acceptable hit are dropped.
pub async fn resolve_identities(
    provider: &dyn PlaylistProvider,
    candidates: &[Track],
    batch_size: usize,
) -> Result<Vec<Resolved>, SyncError> {
    if batch_size == 0 {
        return Err(SyncError::Configuration(
            "resolve batch size must be greater than zero".into(),
        ));
    }

    let mut resolved = Vec::with_capacity(candidates.len());

    for batch in candidates.chunks(batch_size) {
        let results = join_all(
            batch
                .iter()
                .map(|candidate| resolve_identity(provider, candidate)),
        )
        .await;

        for (candidate, result) in batch.iter().zip(results) {
            match result? {
                Some(id) => resolved.push(Resolved {
                    track: candidate.clone(),
                    id,
                }),
                None => tracing::debug!(track = %candidate, "no playable catalog match"),
            }
        }
    }

    tracing::info!(
        candidates = candidates.len(),
        resolved = resolved.len(),
        "resolved catalog identities"
    );

    Ok(resolved)
}
