use std::sync::Arc;

use crate::source::RemoteError;
use crate::track::{CatalogTrack, Track, TrackId};

/// One page of a remote playlist listing.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Track>,
    pub has_next: bool,
}

/// A remote playlist plus the catalog it draws tracks from.
///
/// Page size and mutation limit are fixed by the provider; the engine
/// never asks for more than they allow.
#[async_trait::async_trait]
pub trait PlaylistProvider: Send + Sync {
    /// Human-readable label identifying this playlist.
    fn label(&self) -> &str;

    /// Number of items returned per `list_page` call.
    fn page_size(&self) -> usize;

    /// Maximum number of ids accepted by a single add or delete call.
    fn mutation_limit(&self) -> usize;

    /// List the page of playlist items starting at `offset`.
    async fn list_page(&self, offset: usize) -> Result<Page, RemoteError>;

    /// Search the catalog for an exact name and artist.
    async fn search(&self, name: &str, artist: &str) -> Result<Vec<CatalogTrack>, RemoteError>;

    /// Append tracks to the end of the playlist.
    async fn add_tracks(&self, ids: &[TrackId]) -> Result<(), RemoteError>;

    /// Remove every occurrence of the given tracks from the playlist.
    async fn delete_tracks(&self, ids: &[TrackId]) -> Result<(), RemoteError>;
}

#[async_trait::async_trait]
impl<T: PlaylistProvider + ?Sized> PlaylistProvider for Arc<T> {
    fn label(&self) -> &str {
        (**self).label()
    }

    fn page_size(&self) -> usize {
        (**self).page_size()
    }

    fn mutation_limit(&self) -> usize {
        (**self).mutation_limit()
    }

    async fn list_page(&self, offset: usize) -> Result<Page, RemoteError> {
        (**self).list_page(offset).await
    }

    async fn search(&self, name: &str, artist: &str) -> Result<Vec<CatalogTrack>, RemoteError> {
        (**self).search(name, artist).await
    }

    async fn add_tracks(&self, ids: &[TrackId]) -> Result<(), RemoteError> {
        (**self).add_tracks(ids).await
    }

    async fn delete_tracks(&self, ids: &[TrackId]) -> Result<(), RemoteError> {
        (**self).delete_tracks(ids).await
    }
}
