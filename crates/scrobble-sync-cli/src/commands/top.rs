use std::sync::Arc;

use anyhow::{Context, Result};
use scrobble_sync::{PlaylistProvider, SyncOptions};
use scrobble_sync_http::{HttpTransport, SpotifyPlaylist};

use crate::config::AppConfig;
use crate::sources::HistorySource;

/// Sync most played tracks into the top playlist.
pub async fn run(transport: Arc<HttpTransport>, config: &AppConfig) -> Result<()> {
    let job = config.top.as_ref().context("no [top] job is configured")?;
    job.validate()?;
    let spotify = config.spotify()?;
    let source = HistorySource::top(Arc::clone(&transport), config, job)?;
    let options = SyncOptions::default().with_max_snapshot_size(job.max_snapshot_size);

    super::sync::run("top tracks", &source, options, || async move {
        let playlist = SpotifyPlaylist::connect(transport, spotify, job.playlist_id.clone())
            .await
            .context("failed to authenticate with Spotify")?;
        Ok(Arc::new(playlist) as Arc<dyn PlaylistProvider>)
    })
    .await?;

    Ok(())
}
