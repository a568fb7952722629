use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Method;
use scrobble_sync::{CatalogTrack, Page, PlaylistProvider, RemoteError, Track, TrackId};
use serde::{Deserialize, Serialize};

use crate::transport::{HttpTransport, TransportError, Validate, non_empty};

/// Items returned per playlist page.
pub const SPOTIFY_PAGE_SIZE: usize = 50;

/// Maximum track URIs accepted by one add or delete call.
pub const SPOTIFY_MUTATION_LIMIT: usize = 100;

pub const DEFAULT_MARKET: &str = "NZ";

const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";
const DEFAULT_ACCOUNTS_BASE: &str = "https://accounts.spotify.com";
const PLAYLIST_FIELDS: &str = "next,items(added_at,track(id,name,artists(name),is_local))";
const SEARCH_LIMIT: &str = "1";

/// Credentials and endpoints for the Spotify Web API.
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub market: String,
    pub api_base_url: Option<String>,
    pub accounts_base_url: Option<String>,
}

/// A Spotify playlist, authenticated with a refreshed access token.
pub struct SpotifyPlaylist {
    transport: Arc<HttpTransport>,
    config: SpotifyConfig,
    playlist_id: String,
    access_token: String,
}

impl SpotifyPlaylist {
    /// Exchange the refresh token for an access token and bind to a playlist.
    pub async fn connect(
        transport: Arc<HttpTransport>,
        config: SpotifyConfig,
        playlist_id: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let url = format!(
            "{}/api/token",
            config
                .accounts_base_url
                .as_deref()
                .unwrap_or(DEFAULT_ACCOUNTS_BASE)
        );

        let token: TokenResponse = transport
            .execute(transport.request(Method::POST, &url).form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", config.refresh_token.as_str()),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
            ]))
            .await?;

        Ok(Self {
            transport,
            config,
            playlist_id: playlist_id.into(),
            access_token: token.access_token,
        })
    }

    fn api_base(&self) -> &str {
        self.config
            .api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
    }

    fn tracks_url(&self) -> String {
        format!("{}/playlists/{}/tracks", self.api_base(), self.playlist_id)
    }

    fn build_request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.transport
            .request(method, url)
            .bearer_auth(&self.access_token)
    }
}

fn track_uri(id: &TrackId) -> String {
    format!("spotify:track:{id}")
}

#[async_trait::async_trait]
impl PlaylistProvider for SpotifyPlaylist {
    fn label(&self) -> &str {
        &self.playlist_id
    }

    fn page_size(&self) -> usize {
        SPOTIFY_PAGE_SIZE
    }

    fn mutation_limit(&self) -> usize {
        SPOTIFY_MUTATION_LIMIT
    }

    async fn list_page(&self, offset: usize) -> Result<Page, RemoteError> {
        let url = self.tracks_url();
        let request = self.build_request(Method::GET, &url).query(&[
            ("fields", PLAYLIST_FIELDS.to_owned()),
            ("market", self.config.market.clone()),
            ("limit", SPOTIFY_PAGE_SIZE.to_string()),
            ("offset", offset.to_string()),
        ]);

        let response: PlaylistItemsResponse = self.transport.execute(request).await?;

        let items = response
            .items
            .into_iter()
            .filter_map(|item| {
                // Spotify reports removed catalog entries as a null track.
                let track = item.track?;
                Some(Track {
                    name: track.name,
                    artist: join_artists(&track.artists),
                    provider_id: track.id.map(TrackId::new),
                    added_at: item.added_at,
                })
            })
            .collect();

        Ok(Page {
            items,
            has_next: response.next.is_some(),
        })
    }

    async fn search(&self, name: &str, artist: &str) -> Result<Vec<CatalogTrack>, RemoteError> {
        let url = format!("{}/search", self.api_base());
        let query = format!("track:{} artist:{}", name.trim(), artist.trim());
        let request = self.build_request(Method::GET, &url).query(&[
            ("q", query.as_str()),
            ("type", "track"),
            ("market", self.config.market.as_str()),
            ("limit", SEARCH_LIMIT),
        ]);

        let response: SearchResponse = self.transport.execute(request).await?;

        Ok(response
            .tracks
            .items
            .into_iter()
            .map(|item| CatalogTrack {
                id: TrackId::new(item.id),
                is_playable: item.is_playable,
                is_local: item.is_local,
            })
            .collect())
    }

    async fn add_tracks(&self, ids: &[TrackId]) -> Result<(), RemoteError> {
        let url = self.tracks_url();
        let body = AddTracksRequest {
            uris: ids.iter().map(track_uri).collect(),
        };

        let _: SnapshotResponse = self
            .transport
            .execute(self.build_request(Method::POST, &url).json(&body))
            .await?;
        Ok(())
    }

    async fn delete_tracks(&self, ids: &[TrackId]) -> Result<(), RemoteError> {
        let url = self.tracks_url();
        let body = DeleteTracksRequest {
            tracks: ids.iter().map(|id| TrackUri { uri: track_uri(id) }).collect(),
        };

        let _: SnapshotResponse = self
            .transport
            .execute(self.build_request(Method::DELETE, &url).json(&body))
            .await?;
        Ok(())
    }
}

fn join_artists(artists: &[Artist]) -> String {
    artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl Validate for TokenResponse {
    fn validate(&self) -> Result<(), String> {
        non_empty("access_token", &self.access_token)
    }
}

#[derive(Debug, Deserialize)]
struct PlaylistItemsResponse {
    items: Vec<PlaylistItem>,
    next: Option<String>,
}

impl Validate for PlaylistItemsResponse {
    fn validate(&self) -> Result<(), String> {
        for track in self.items.iter().filter_map(|i| i.track.as_ref()) {
            if track.artists.is_empty() {
                return Err(format!("track {:?} has no artists", track.name));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    added_at: Option<DateTime<Utc>>,
    track: Option<PlaylistTrack>,
}

#[derive(Debug, Deserialize)]
struct PlaylistTrack {
    id: Option<String>,
    name: String,
    artists: Vec<Artist>,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: SearchTracks,
}

impl Validate for SearchResponse {
    fn validate(&self) -> Result<(), String> {
        self.tracks
            .items
            .iter()
            .try_for_each(|item| non_empty("tracks.items[].id", &item.id))
    }
}

#[derive(Debug, Deserialize)]
struct SearchTracks {
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: String,
    #[serde(default)]
    is_playable: bool,
    #[serde(default)]
    is_local: bool,
}

#[derive(Debug, Serialize)]
struct AddTracksRequest {
    uris: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DeleteTracksRequest {
    tracks: Vec<TrackUri>,
}

#[derive(Debug, Serialize)]
struct TrackUri {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    snapshot_id: String,
}

impl Validate for SnapshotResponse {
    fn validate(&self) -> Result<(), String> {
        non_empty("snapshot_id", &self.snapshot_id)
    }
}
