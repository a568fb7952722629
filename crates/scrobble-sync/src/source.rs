use std::sync::Arc;

use crate::track::Track;

/// Errors raised by remote collaborators (history sources and playlist providers).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Network failure, timeout or an unsuccessful HTTP status.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response arrived but did not have the expected shape.
    #[error("validation error: {0}")]
    Validation(String),
}

/// A source of recently or frequently played tracks.
///
/// Implementations normalize their own paginated or aggregated history into
/// a flat list that is already deduplicated by name and artist.
#[async_trait::async_trait]
pub trait TrackSource: Send + Sync {
    /// Human-readable label identifying this source.
    fn label(&self) -> &str;

    /// List the candidate tracks, name and artist only.
    async fn list_tracks(&self) -> Result<Vec<Track>, RemoteError>;
}

#[async_trait::async_trait]
impl<T: TrackSource + ?Sized> TrackSource for Arc<T> {
    fn label(&self) -> &str {
        (**self).label()
    }

    async fn list_tracks(&self) -> Result<Vec<Track>, RemoteError> {
        (**self).list_tracks().await
    }
}
