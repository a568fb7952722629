use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::mutate::BatchMutator;
use crate::playlist::PlaylistProvider;
use crate::snapshot::Snapshot;
use crate::sync::SyncError;
use crate::track::{Track, TrackId};

/// Whether a track has aged past the rolling window.
///
/// Only tracks that carry an `added_at` can expire. A track exactly
/// `max_age_seconds` old is retained.
pub fn is_expired(track: &Track, max_age_seconds: u64, now: DateTime<Utc>) -> bool {
    track.added_at.is_some_and(|added_at| {
        let age = now.signed_duration_since(added_at).num_seconds();
        age > 0 && age as u64 > max_age_seconds
    })
}

/// Delete snapshot entries older than the rolling window.
///
/// Returns the retained entries, in their original order, and the number of
/// distinct identities deleted. No call is made when nothing has expired.
/// Deleting an identity removes every entry that carries it, so a fresh
/// entry sharing an id with an expired one is dropped from the retained set
/// too. Expired entries without a provider identity cannot be addressed and
/// are retained.
pub async fn evict_expired(
    provider: &dyn PlaylistProvider,
    snapshot: Snapshot,
    max_age_seconds: u64,
    now: DateTime<Utc>,
) -> Result<(Snapshot, usize), SyncError> {
    let tracks = snapshot.into_tracks();

    let mut expired: HashSet<TrackId> = HashSet::new();
    let ids: Vec<TrackId> = tracks
        .iter()
        .filter(|track| is_expired(track, max_age_seconds, now))
        .filter_map(|track| track.provider_id.clone())
        .filter(|id| expired.insert(id.clone()))
        .collect();

    let unaddressable = tracks
        .iter()
        .filter(|t| t.provider_id.is_none() && is_expired(t, max_age_seconds, now))
        .count();
    if unaddressable > 0 {
        tracing::warn!(
            playlist = provider.label(),
            count = unaddressable,
            "expired entries without a provider id were kept"
        );
    }

    if ids.is_empty() {
        return Ok((Snapshot::new(tracks), 0));
    }

    let deleted = BatchMutator::new(provider).delete_all(&ids).await?;
    let retained: Vec<Track> = tracks
        .into_iter()
        .filter(|track| track.provider_id.as_ref().is_none_or(|id| !expired.contains(id)))
        .collect();
    tracing::info!(
        playlist = provider.label(),
        deleted,
        max_age_seconds,
        "evicted entries outside the rolling window"
    );

    Ok((Snapshot::new(retained), deleted))
}
