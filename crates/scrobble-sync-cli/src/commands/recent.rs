use std::sync::Arc;

use anyhow::{Context, Result};
use scrobble_sync::{PlaylistProvider, SyncOptions};
use scrobble_sync_http::{HttpTransport, SpotifyPlaylist};

use crate::config::AppConfig;
use crate::sources::HistorySource;

/// Sync recently played tracks into the recent playlist, evicting entries
/// older than the rolling window when one is configured.
pub async fn run(transport: Arc<HttpTransport>, config: &AppConfig) -> Result<()> {
    let job = config
        .recent
        .as_ref()
        .context("no [recent] job is configured")?;
    job.validate()?;
    let spotify = config.spotify()?;
    let source = HistorySource::recent(Arc::clone(&transport), config, job)?;

    let mut options = SyncOptions::default().with_max_snapshot_size(job.max_snapshot_size);
    if let Some(max_age) = job.max_age_seconds {
        options = options.with_max_age_seconds(max_age);
    }

    super::sync::run("recent tracks", &source, options, || async move {
        let playlist = SpotifyPlaylist::connect(transport, spotify, job.playlist_id.clone())
            .await
            .context("failed to authenticate with Spotify")?;
        Ok(Arc::new(playlist) as Arc<dyn PlaylistProvider>)
    })
    .await?;

    Ok(())
}
