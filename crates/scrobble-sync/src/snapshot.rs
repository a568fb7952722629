use std::collections::HashSet;

use crate::playlist::PlaylistProvider;
use crate::sync::SyncError;
use crate::track::{Track, TrackId, TrackKey};

/// The materialized, size-capped contents of a remote playlist at the
/// start of a sync run. May be truncated by the cap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    tracks: Vec<Track>,
}

impl Snapshot {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Approximate identities of every entry under the given normalization.
    pub fn keys(&self, normalize: impl Fn(&str) -> String) -> HashSet<TrackKey> {
        self.tracks.iter().map(|t| t.key_with(&normalize)).collect()
    }

    /// Provider identities of every entry that has one.
    pub fn provider_ids(&self) -> HashSet<&TrackId> {
        self.tracks
            .iter()
            .filter_map(|t| t.provider_id.as_ref())
            .collect()
    }
}

/// Read the playlist page by page until the provider reports no further
/// page or the running offset reaches `max_size`.
///
/// A partial last page is kept as-is; no page is requested to backfill it.
/// Any page failure aborts the fetch.
pub async fn fetch_snapshot(
    provider: &dyn PlaylistProvider,
    max_size: usize,
) -> Result<Snapshot, SyncError> {
    let page_size = provider.page_size();
    if page_size == 0 {
        return Err(SyncError::Configuration(format!(
            "playlist provider {} reports a zero page size",
            provider.label()
        )));
    }

    let mut tracks = Vec::new();
    let mut offset = 0;

    loop {
        let page = provider.list_page(offset).await?;
        tracks.extend(page.items);
        offset += page_size;

        if !page.has_next {
            break;
        }
        if offset >= max_size {
            tracing::debug!(
                playlist = provider.label(),
                offset,
                max_size,
                "snapshot cap reached, remaining pages skipped"
            );
            break;
        }
    }

    Ok(Snapshot::new(tracks))
}

#[cfg(test)]
mod tests {
    use crate::test_support::InMemoryPlaylist;
    use crate::track::normalize;

    use super::*;

    fn playlist_with(count: usize, page_size: usize) -> InMemoryPlaylist {
        let mut playlist = InMemoryPlaylist::new("test").with_page_size(page_size);
        for i in 0..count {
            playlist.push(Track::new(format!("song {i}"), "band").with_provider_id(format!("id{i}")));
        }
        playlist
    }

    #[tokio::test]
    async fn fetches_every_page_when_under_cap() {
        let playlist = playlist_with(120, 50);

        let snapshot = fetch_snapshot(&playlist, 500).await.unwrap();

        assert_eq!(snapshot.len(), 120);
        assert_eq!(playlist.calls().page_offsets, vec![0, 50, 100]);
    }

    #[tokio::test]
    async fn stops_at_cap_even_when_more_pages_exist() {
        let playlist = playlist_with(700, 50);

        let snapshot = fetch_snapshot(&playlist, 500).await.unwrap();

        assert_eq!(snapshot.len(), 500);
        assert_eq!(playlist.calls().page_offsets.len(), 10);
        assert_eq!(playlist.calls().page_offsets.last(), Some(&450));
    }

    #[tokio::test]
    async fn cap_not_multiple_of_page_size_keeps_whole_pages() {
        let playlist = playlist_with(200, 50);

        let snapshot = fetch_snapshot(&playlist, 120).await.unwrap();

        assert_eq!(snapshot.len(), 150);
        assert_eq!(playlist.calls().page_offsets, vec![0, 50, 100]);
    }

    #[tokio::test]
    async fn empty_playlist_makes_one_request() {
        let playlist = playlist_with(0, 50);

        let snapshot = fetch_snapshot(&playlist, 500).await.unwrap();

        assert!(snapshot.is_empty());
        assert_eq!(playlist.calls().page_offsets, vec![0]);
    }

    #[tokio::test]
    async fn page_failure_returns_no_snapshot() {
        let mut playlist = playlist_with(120, 50);
        playlist.fail_page_at(50);

        let result = fetch_snapshot(&playlist, 500).await;

        assert!(matches!(result, Err(SyncError::Transport(_))));
    }

    #[test]
    fn keys_and_ids_skip_missing_identities() {
        let snapshot = Snapshot::new(vec![
            Track::new("A", "X").with_provider_id("id1"),
            Track::new("B", "Y"),
        ]);

        assert_eq!(snapshot.keys(normalize).len(), 2);
        let ids = snapshot.provider_ids();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(&TrackId::new("id1")));
    }
}
