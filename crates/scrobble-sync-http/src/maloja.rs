use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use scrobble_sync::{Track, TrackKey};
use serde::Deserialize;

use crate::history::{DAY_IN_SECONDS, distinct};
use crate::transport::{HttpTransport, TransportError, Validate, non_empty};

/// Scrobbles requested in the single page this client reads.
pub const MALOJA_MAX_PER_PAGE: usize = 2500;

/// Accepted range for the recent-tracks window, in seconds.
pub const RECENT_CUTOFF_RANGE: std::ops::RangeInclusive<u64> = 3600..=2_592_000;

/// Accepted range for the top-tracks period, in days.
pub const TOP_PERIOD_DAYS_RANGE: std::ops::RangeInclusive<u32> = 1..=90;

/// Server and credentials for a Maloja instance.
#[derive(Debug, Clone)]
pub struct MalojaConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

/// Reads scrobbles from a self-hosted Maloja server.
pub struct MalojaClient {
    transport: Arc<HttpTransport>,
    config: MalojaConfig,
}

impl MalojaClient {
    pub fn new(transport: Arc<HttpTransport>, config: MalojaConfig) -> Self {
        Self { transport, config }
    }

    /// Scrobbles at or after `cutoff`.
    ///
    /// Maloja's `from` filter is a date in server time. The request sends the
    /// UTC date of the day before the cutoff and the result is trimmed by
    /// timestamp here. Only one page is read.
    async fn scrobbles_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Scrobble>, TransportError> {
        let url = format!(
            "{}/apis/mlj_1/scrobbles",
            self.config.base_url.trim_end_matches('/')
        );
        let from = from_date(cutoff);

        let request = self
            .transport
            .request(Method::GET, &url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .query(&[
                ("perpage", MALOJA_MAX_PER_PAGE.to_string()),
                ("page", "0".to_owned()),
                ("from", from),
            ]);
        let response: ScrobblesResponse = self.transport.execute(request).await?;

        if response.pagination.next_page.is_some() {
            tracing::warn!(
                per_page = MALOJA_MAX_PER_PAGE,
                "reached the per-page limit fetching Maloja scrobbles, history may be incomplete"
            );
        }

        let cutoff = cutoff.timestamp();
        Ok(response
            .list
            .into_iter()
            .filter(|s| s.time >= cutoff)
            .collect())
    }

    /// Distinct tracks scrobbled in the `cutoff_seconds` before `now`,
    /// in the order the server returned them.
    pub async fn recent_tracks(
        &self,
        cutoff_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Track>, TransportError> {
        let cutoff = now - Duration::seconds(cutoff_seconds as i64);
        let scrobbles = self.scrobbles_since(cutoff).await?;

        Ok(distinct(scrobbles.into_iter().map(Scrobble::into_track)))
    }

    /// Tracks scrobbled at least `min_play_count` times in the last
    /// `period_days`, most played first.
    pub async fn top_tracks(
        &self,
        period_days: u32,
        min_play_count: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Track>, TransportError> {
        let cutoff = now - Duration::days(i64::from(period_days));
        let scrobbles = self.scrobbles_since(cutoff).await?;

        Ok(rank_by_play_count(
            scrobbles.into_iter().map(Scrobble::into_track),
            min_play_count,
        ))
    }
}

/// The `from` filter for `cutoff`: the UTC calendar date one day earlier.
///
/// The date is formatted in UTC while Maloja interprets it in server time.
/// The one-day margin absorbs that offset and results are trimmed by
/// timestamp afterwards.
fn from_date(cutoff: DateTime<Utc>) -> String {
    (cutoff - Duration::seconds(DAY_IN_SECONDS))
        .format("%Y/%m/%d")
        .to_string()
}

/// Count plays per name/artist, drop those under `min_play_count` and sort
/// by count, most played first. Ties keep first-seen order.
fn rank_by_play_count(plays: impl IntoIterator<Item = Track>, min_play_count: u64) -> Vec<Track> {
    let mut index: HashMap<TrackKey, usize> = HashMap::new();
    let mut counted: Vec<(Track, u64)> = Vec::new();

    for track in plays {
        match index.get(&track.key()) {
            Some(&i) => counted[i].1 += 1,
            None => {
                index.insert(track.key(), counted.len());
                counted.push((track, 1));
            }
        }
    }

    counted.retain(|(_, count)| *count >= min_play_count);
    counted.sort_by(|a, b| b.1.cmp(&a.1));
    counted.into_iter().map(|(track, _)| track).collect()
}

#[derive(Debug, Deserialize)]
struct ScrobblesResponse {
    status: String,
    list: Vec<Scrobble>,
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
struct Scrobble {
    time: i64,
    track: ScrobbleTrack,
}

impl Scrobble {
    fn into_track(self) -> Track {
        Track::new(self.track.title, self.track.artists.join(", "))
    }
}

#[derive(Debug, Deserialize)]
struct ScrobbleTrack {
    artists: Vec<String>,
    title: String,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    next_page: Option<String>,
}

impl Validate for ScrobblesResponse {
    fn validate(&self) -> Result<(), String> {
        if self.status != "ok" {
            return Err(format!("status is {:?}, expected \"ok\"", self.status));
        }
        self.list.iter().try_for_each(|s| {
            if s.time <= 0 {
                return Err(format!("scrobble time {} is not positive", s.time));
            }
            non_empty("list[].track.title", &s.track.title)?;
            if s.track.artists.is_empty() {
                return Err(format!("scrobble {:?} has no artists", s.track.title));
            }
            s.track
                .artists
                .iter()
                .try_for_each(|a| non_empty("list[].track.artists[]", a))
        })
    }
}
