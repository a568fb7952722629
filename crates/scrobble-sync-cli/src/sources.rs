use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use scrobble_sync::{RemoteError, Track, TrackSource};
use scrobble_sync_http::{HttpTransport, LastFmClient, MalojaClient, TopPeriod};

use crate::config::{AppConfig, RecentJob, SourceKind, TopJob};

/// The listening history a job reads from, chosen once from config.
pub enum HistorySource {
    LastFmRecent {
        client: LastFmClient,
        cutoff_seconds: u64,
    },
    LastFmTop {
        client: LastFmClient,
        period: TopPeriod,
        min_play_count: u64,
    },
    MalojaRecent {
        client: MalojaClient,
        cutoff_seconds: u64,
    },
    MalojaTop {
        client: MalojaClient,
        period_days: u32,
        min_play_count: u64,
    },
}

impl HistorySource {
    pub fn recent(
        transport: Arc<HttpTransport>,
        config: &AppConfig,
        job: &RecentJob,
    ) -> Result<Self> {
        Ok(match job.source {
            SourceKind::LastFm => Self::LastFmRecent {
                client: LastFmClient::new(transport, config.lastfm()?),
                cutoff_seconds: job.cutoff_seconds,
            },
            SourceKind::Maloja => Self::MalojaRecent {
                client: MalojaClient::new(transport, config.maloja()?),
                cutoff_seconds: job.cutoff_seconds,
            },
        })
    }

    pub fn top(transport: Arc<HttpTransport>, config: &AppConfig, job: &TopJob) -> Result<Self> {
        Ok(match job.source {
            SourceKind::LastFm => Self::LastFmTop {
                client: LastFmClient::new(transport, config.lastfm()?),
                period: job.period.context("top.period is required for Last.fm")?,
                min_play_count: job.min_play_count,
            },
            SourceKind::Maloja => Self::MalojaTop {
                client: MalojaClient::new(transport, config.maloja()?),
                period_days: job
                    .period_days
                    .context("top.period_days is required for Maloja")?,
                min_play_count: job.min_play_count,
            },
        })
    }
}

#[async_trait::async_trait]
impl TrackSource for HistorySource {
    fn label(&self) -> &str {
        match self {
            Self::LastFmRecent { .. } => "Last.fm recent tracks",
            Self::LastFmTop { .. } => "Last.fm top tracks",
            Self::MalojaRecent { .. } => "Maloja recent tracks",
            Self::MalojaTop { .. } => "Maloja top tracks",
        }
    }

    async fn list_tracks(&self) -> Result<Vec<Track>, RemoteError> {
        let now = Utc::now();
        let tracks = match self {
            Self::LastFmRecent {
                client,
                cutoff_seconds,
            } => client.recent_tracks(*cutoff_seconds, now).await,
            Self::LastFmTop {
                client,
                period,
                min_play_count,
            } => client.top_tracks(*period, *min_play_count).await,
            Self::MalojaRecent {
                client,
                cutoff_seconds,
            } => client.recent_tracks(*cutoff_seconds, now).await,
            Self::MalojaTop {
                client,
                period_days,
                min_play_count,
            } => client.top_tracks(*period_days, *min_play_count, now).await,
        };
        tracks.map_err(RemoteError::from)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::parse_config;

    fn config_for(server: &MockServer) -> AppConfig {
        let toml_str = format!(
            r#"
[spotify]
client_id = "cid"

[lastfm]
username = "listener"
api_key = "key"

[maloja]
base_url = "{}"
username = "admin"
password = "pw"

[recent]
playlist_id = "recent"
source = "lastfm"
cutoff_seconds = 3600

[top]
playlist_id = "top"
source = "maloja"
period_days = 7
"#,
            server.uri()
        );
        parse_config(&toml_str).unwrap()
    }

    #[test]
    fn picks_variant_from_config() {
        let config = config_for_uri("http://localhost:1");
        let transport = Arc::new(HttpTransport::new().unwrap());

        let recent =
            HistorySource::recent(Arc::clone(&transport), &config, config.recent.as_ref().unwrap())
                .unwrap();
        assert!(matches!(recent, HistorySource::LastFmRecent { cutoff_seconds: 3600, .. }));

        let top = HistorySource::top(transport, &config, config.top.as_ref().unwrap()).unwrap();
        assert!(matches!(top, HistorySource::MalojaTop { period_days: 7, .. }));
        assert_eq!(top.label(), "Maloja top tracks");
    }

    fn config_for_uri(uri: &str) -> AppConfig {
        let mut config = parse_config(
            r#"
[spotify]
client_id = "cid"

[lastfm]
username = "listener"
api_key = "key"

[recent]
playlist_id = "recent"
source = "lastfm"
cutoff_seconds = 3600

[top]
playlist_id = "top"
source = "maloja"
period_days = 7
"#,
        )
        .unwrap();
        config.maloja = Some(crate::config::MalojaSection {
            base_url: uri.into(),
            username: "admin".into(),
            password: Some("pw".into()),
        });
        config
    }

    #[test]
    fn missing_provider_section_is_an_error() {
        let mut config = config_for_uri("http://localhost:1");
        config.lastfm = None;
        let transport = Arc::new(HttpTransport::new().unwrap());

        let result = HistorySource::recent(transport, &config, config.recent.as_ref().unwrap());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn maloja_failure_maps_to_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apis/mlj_1/scrobbles"))
            .and(query_param("perpage", "2500"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let config = config_for(&server);
        let transport = Arc::new(HttpTransport::new().unwrap());
        let source =
            HistorySource::top(transport, &config, config.top.as_ref().unwrap()).unwrap();

        let result = source.list_tracks().await;
        assert!(matches!(result, Err(RemoteError::Validation(_))), "got {result:?}");
    }
}
