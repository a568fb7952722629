use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Method;
use scrobble_sync::Track;
use serde::Deserialize;

use crate::history::{distinct, lenient_u64};
use crate::transport::{HttpTransport, TransportError, Validate, non_empty};

/// Largest page Last.fm serves for history queries.
pub const LASTFM_MAX_LIMIT: usize = 200;

/// Shortest recent-tracks window Last.fm jobs accept.
pub const MIN_RECENT_CUTOFF_SECONDS: u64 = 3600;

const DEFAULT_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";

/// Aggregation period for `user.getTopTracks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TopPeriod {
    #[serde(rename = "7day")]
    SevenDays,
    #[serde(rename = "1month")]
    OneMonth,
    #[serde(rename = "3month")]
    ThreeMonths,
    #[serde(rename = "6month")]
    SixMonths,
    #[serde(rename = "12month")]
    TwelveMonths,
    #[serde(rename = "overall")]
    Overall,
}

impl TopPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SevenDays => "7day",
            Self::OneMonth => "1month",
            Self::ThreeMonths => "3month",
            Self::SixMonths => "6month",
            Self::TwelveMonths => "12month",
            Self::Overall => "overall",
        }
    }
}

impl fmt::Display for TopPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account and endpoint for the Last.fm API.
#[derive(Debug, Clone)]
pub struct LastFmConfig {
    pub username: String,
    pub api_key: String,
    pub api_base_url: Option<String>,
}

/// Reads a user's listening history from Last.fm.
pub struct LastFmClient {
    transport: Arc<HttpTransport>,
    config: LastFmConfig,
}

impl LastFmClient {
    pub fn new(transport: Arc<HttpTransport>, config: LastFmConfig) -> Self {
        Self { transport, config }
    }

    fn build_request(&self, method: &str) -> reqwest::RequestBuilder {
        let base = self
            .config
            .api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE);
        let limit = LASTFM_MAX_LIMIT.to_string();

        self.transport.request(Method::GET, base).query(&[
            ("method", method),
            ("user", self.config.username.as_str()),
            ("api_key", self.config.api_key.as_str()),
            ("format", "json"),
            ("limit", limit.as_str()),
        ])
    }

    /// Distinct tracks scrobbled in the `cutoff_seconds` before `now`.
    pub async fn recent_tracks(
        &self,
        cutoff_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Track>, TransportError> {
        let to = now.timestamp();
        let from = to - cutoff_seconds as i64;

        let request = self
            .build_request("user.getRecentTracks")
            .query(&[("from", from), ("to", to)]);
        let response: RecentTracksResponse = self.transport.execute(request).await?;

        Ok(distinct(
            response
                .recenttracks
                .track
                .into_iter()
                .map(|t| Track::new(t.name, t.artist.text)),
        ))
    }

    /// Distinct top tracks for `period` played at least `min_play_count` times.
    pub async fn top_tracks(
        &self,
        period: TopPeriod,
        min_play_count: u64,
    ) -> Result<Vec<Track>, TransportError> {
        let request = self
            .build_request("user.getTopTracks")
            .query(&[("period", period.as_str())]);
        let response: TopTracksResponse = self.transport.execute(request).await?;

        Ok(distinct(
            response
                .toptracks
                .track
                .into_iter()
                .filter(|t| t.playcount >= min_play_count)
                .map(|t| Track::new(t.name, t.artist.name)),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct RecentTracksResponse {
    recenttracks: RecentTracks,
}

#[derive(Debug, Deserialize)]
struct RecentTracks {
    track: Vec<RecentTrack>,
}

#[derive(Debug, Deserialize)]
struct RecentTrack {
    name: String,
    artist: RecentArtist,
}

#[derive(Debug, Deserialize)]
struct RecentArtist {
    #[serde(rename = "#text")]
    text: String,
}

impl Validate for RecentTracksResponse {
    fn validate(&self) -> Result<(), String> {
        self.recenttracks.track.iter().try_for_each(|t| {
            non_empty("recenttracks.track[].name", &t.name)?;
            non_empty("recenttracks.track[].artist", &t.artist.text)
        })
    }
}

#[derive(Debug, Deserialize)]
struct TopTracksResponse {
    toptracks: TopTracks,
}

#[derive(Debug, Deserialize)]
struct TopTracks {
    track: Vec<TopTrack>,
}

#[derive(Debug, Deserialize)]
struct TopTrack {
    name: String,
    artist: TopArtist,
    #[serde(deserialize_with = "lenient_u64")]
    playcount: u64,
}

#[derive(Debug, Deserialize)]
struct TopArtist {
    name: String,
}

impl Validate for TopTracksResponse {
    fn validate(&self) -> Result<(), String> {
        self.toptracks.track.iter().try_for_each(|t| {
            non_empty("toptracks.track[].name", &t.name)?;
            non_empty("toptracks.track[].artist", &t.artist.name)?;
            if t.playcount == 0 {
                return Err(format!("track {:?} has a zero play count", t.name));
            }
            Ok(())
        })
    }
}
