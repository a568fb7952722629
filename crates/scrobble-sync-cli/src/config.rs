use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail, ensure};
use scrobble_sync::sync::DEFAULT_MAX_SNAPSHOT_SIZE;
use scrobble_sync_http::lastfm::MIN_RECENT_CUTOFF_SECONDS;
use scrobble_sync_http::maloja::{RECENT_CUTOFF_RANGE, TOP_PERIOD_DAYS_RANGE};
use scrobble_sync_http::spotify::DEFAULT_MARKET;
use scrobble_sync_http::{LastFmConfig, MalojaConfig, SpotifyConfig, TopPeriod};
use serde::Deserialize;

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub spotify: SpotifySection,
    pub lastfm: Option<LastFmSection>,
    pub maloja: Option<MalojaSection>,
    pub recent: Option<RecentJob>,
    pub top: Option<TopJob>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifySection {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(default = "default_market")]
    pub market: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LastFmSection {
    pub username: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MalojaSection {
    pub base_url: String,
    pub username: String,
    pub password: Option<String>,
}

/// Which history provider feeds a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "lastfm")]
    LastFm,
    #[serde(rename = "maloja")]
    Maloja,
}

/// The recently-played playlist job.
#[derive(Debug, Clone, Deserialize)]
pub struct RecentJob {
    pub playlist_id: String,
    pub source: SourceKind,
    pub cutoff_seconds: u64,
    /// Rolling window; entries older than this are removed.
    pub max_age_seconds: Option<u64>,
    #[serde(default = "default_max_snapshot_size")]
    pub max_snapshot_size: usize,
}

/// The most-played playlist job.
#[derive(Debug, Clone, Deserialize)]
pub struct TopJob {
    pub playlist_id: String,
    pub source: SourceKind,
    /// Last.fm aggregation period.
    pub period: Option<TopPeriod>,
    /// Maloja aggregation window in days.
    pub period_days: Option<u32>,
    #[serde(default = "default_min_play_count")]
    pub min_play_count: u64,
    #[serde(default = "default_max_snapshot_size")]
    pub max_snapshot_size: usize,
}

fn default_market() -> String {
    DEFAULT_MARKET.into()
}

fn default_max_snapshot_size() -> usize {
    DEFAULT_MAX_SNAPSHOT_SIZE
}

fn default_min_play_count() -> u64 {
    1
}

impl RecentJob {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.playlist_id.trim().is_empty(),
            "recent.playlist_id must not be empty"
        );
        match self.source {
            SourceKind::LastFm => ensure!(
                self.cutoff_seconds >= MIN_RECENT_CUTOFF_SECONDS,
                "recent.cutoff_seconds must be at least {MIN_RECENT_CUTOFF_SECONDS} for Last.fm"
            ),
            SourceKind::Maloja => ensure!(
                RECENT_CUTOFF_RANGE.contains(&self.cutoff_seconds),
                "recent.cutoff_seconds must be between {} and {} for Maloja",
                RECENT_CUTOFF_RANGE.start(),
                RECENT_CUTOFF_RANGE.end()
            ),
        }
        if let Some(max_age) = self.max_age_seconds {
            ensure!(max_age > 0, "recent.max_age_seconds must be greater than zero");
        }
        ensure!(
            self.max_snapshot_size > 0,
            "recent.max_snapshot_size must be greater than zero"
        );
        Ok(())
    }
}

impl TopJob {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.playlist_id.trim().is_empty(),
            "top.playlist_id must not be empty"
        );
        ensure!(self.min_play_count >= 1, "top.min_play_count must be at least 1");
        match self.source {
            SourceKind::LastFm => ensure!(
                self.period.is_some(),
                "top.period is required for Last.fm (7day, 1month, 3month, 6month, 12month, overall)"
            ),
            SourceKind::Maloja => match self.period_days {
                Some(days) => ensure!(
                    TOP_PERIOD_DAYS_RANGE.contains(&days),
                    "top.period_days must be between {} and {} for Maloja",
                    TOP_PERIOD_DAYS_RANGE.start(),
                    TOP_PERIOD_DAYS_RANGE.end()
                ),
                None => bail!("top.period_days is required for Maloja"),
            },
        }
        ensure!(
            self.max_snapshot_size > 0,
            "top.max_snapshot_size must be greater than zero"
        );
        Ok(())
    }
}

impl AppConfig {
    /// Fill secrets from the environment. Environment values win over the file.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup("SPOTIFY_CLIENT_SECRET") {
            self.spotify.client_secret = Some(secret);
        }
        if let Some(token) = lookup("SPOTIFY_REFRESH_TOKEN") {
            self.spotify.refresh_token = Some(token);
        }
        if let (Some(lastfm), Some(key)) = (self.lastfm.as_mut(), lookup("LASTFM_API_KEY")) {
            lastfm.api_key = Some(key);
        }
        if let (Some(maloja), Some(password)) =
            (self.maloja.as_mut(), lookup("MALOJA_AUTH_PASSWORD"))
        {
            maloja.password = Some(password);
        }
    }

    pub fn spotify(&self) -> Result<SpotifyConfig> {
        let section = &self.spotify;
        Ok(SpotifyConfig {
            client_id: required(Some(&section.client_id), "spotify.client_id")?,
            client_secret: required(
                section.client_secret.as_ref(),
                "spotify.client_secret (or SPOTIFY_CLIENT_SECRET)",
            )?,
            refresh_token: required(
                section.refresh_token.as_ref(),
                "spotify.refresh_token (or SPOTIFY_REFRESH_TOKEN)",
            )?,
            market: section.market.clone(),
            api_base_url: None,
            accounts_base_url: None,
        })
    }

    pub fn lastfm(&self) -> Result<LastFmConfig> {
        let section = self
            .lastfm
            .as_ref()
            .context("a [lastfm] section is required for Last.fm jobs")?;
        Ok(LastFmConfig {
            username: required(Some(&section.username), "lastfm.username")?,
            api_key: required(section.api_key.as_ref(), "lastfm.api_key (or LASTFM_API_KEY)")?,
            api_base_url: None,
        })
    }

    pub fn maloja(&self) -> Result<MalojaConfig> {
        let section = self
            .maloja
            .as_ref()
            .context("a [maloja] section is required for Maloja jobs")?;
        Ok(MalojaConfig {
            base_url: required(Some(&section.base_url), "maloja.base_url")?,
            username: required(Some(&section.username), "maloja.username")?,
            password: required(
                section.password.as_ref(),
                "maloja.password (or MALOJA_AUTH_PASSWORD)",
            )?,
        })
    }
}

fn required(value: Option<&String>, name: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => bail!("missing required setting {name}"),
    }
}

/// Default config file path: `~/.config/scrobble-sync/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("scrobble-sync").join("config.toml"))
}

pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).context("invalid configuration")
}

/// Load config from `path`, or the default location, then apply
/// environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path().context("could not determine config directory")?,
    };

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let mut config =
        parse_config(&contents).with_context(|| format!("in {}", path.display()))?;
    config.apply_env(|key| std::env::var(key).ok());

    Ok(config)
}
