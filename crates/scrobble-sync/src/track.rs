use std::fmt;

use chrono::{DateTime, Utc};

/// Provider-assigned identifier for a track in a playlist provider's catalog.
/// Opaque to the engine; only compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Approximate identity of a track: normalized name and artist joined by a NUL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackKey(String);

impl TrackKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Default normalization for approximate comparison: trim, then lowercase.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// A track as seen by a history source or a playlist provider.
///
/// Sources only fill `name` and `artist`. Playlist snapshots also carry
/// the provider identity and, where the provider reports it, the time the
/// entry was added to the playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub name: String,
    pub artist: String,
    pub provider_id: Option<TrackId>,
    pub added_at: Option<DateTime<Utc>>,
}

impl Track {
    pub fn new(name: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            artist: artist.into(),
            provider_id: None,
            added_at: None,
        }
    }

    pub fn with_provider_id(mut self, id: impl Into<String>) -> Self {
        self.provider_id = Some(TrackId::new(id));
        self
    }

    pub fn with_added_at(mut self, added_at: DateTime<Utc>) -> Self {
        self.added_at = Some(added_at);
        self
    }

    /// Approximate identity using the default normalization.
    pub fn key(&self) -> TrackKey {
        self.key_with(normalize)
    }

    /// Approximate identity using a caller-supplied normalization.
    pub fn key_with(&self, normalize: impl Fn(&str) -> String) -> TrackKey {
        TrackKey(format!("{}\0{}", normalize(&self.name), normalize(&self.artist)))
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.name)
    }
}

/// A single catalog search hit from a playlist provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTrack {
    pub id: TrackId,
    pub is_playable: bool,
    pub is_local: bool,
}

impl CatalogTrack {
    /// Whether this hit can be added to a playlist.
    pub fn is_acceptable(&self) -> bool {
        self.is_playable && !self.is_local
    }
}

/// A candidate paired with the provider identity it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub track: Track,
    pub id: TrackId,
}

/// Outcome of one sync run. Counts are confirmed mutations, not attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncResult {
    pub added: usize,
    pub deleted: usize,
}
