use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use scrobble_sync::{PlaylistProvider, SyncEngine, SyncOptions, SyncResult, TrackSource};

/// Read candidates from `source` and reconcile them into the playlist that
/// `connect` opens.
///
/// With no candidates and no rolling window there is nothing to do, so the
/// playlist is never contacted.
pub async fn run<F, Fut>(
    playlist_name: &str,
    source: &dyn TrackSource,
    options: SyncOptions,
    connect: F,
) -> Result<SyncResult>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Arc<dyn PlaylistProvider>>>,
{
    options.validate()?;

    let candidates = source
        .list_tracks()
        .await
        .with_context(|| format!("failed to read tracks from {}", source.label()))?;
    tracing::info!(
        source = source.label(),
        candidates = candidates.len(),
        "read listening history"
    );

    if candidates.is_empty() && options.max_age_seconds.is_none() {
        tracing::info!("No tracks to add to the {playlist_name} playlist.");
        return Ok(SyncResult::default());
    }

    let provider = connect().await?;
    let engine = SyncEngine::new(provider, options);
    let result = engine.run(&candidates).await?;

    tracing::info!(
        "Added {} new tracks to the {playlist_name} playlist, deleted {}.",
        result.added,
        result.deleted
    );
    Ok(result)
}
