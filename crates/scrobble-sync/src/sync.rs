use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::dedup;
use crate::evict::evict_expired;
use crate::mutate::BatchMutator;
use crate::playlist::PlaylistProvider;
use crate::resolve::resolve_identities;
use crate::snapshot::fetch_snapshot;
use crate::source::RemoteError;
use crate::track::{SyncResult, Track, TrackId, normalize};

/// Default cap on the number of playlist entries read per run.
pub const DEFAULT_MAX_SNAPSHOT_SIZE: usize = 500;

/// Default number of catalog searches issued concurrently.
pub const DEFAULT_RESOLVE_BATCH_SIZE: usize = 20;

/// Which mutating call a partial failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Add,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Errors that terminate a sync run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("response validation failed: {0}")]
    Validation(String),

    #[error("transport failure: {0}")]
    Transport(String),

    /// A chunked mutation failed after earlier chunks were applied.
    /// Applied chunks are left in place.
    #[error("{operation} failed after {applied} of {requested} tracks were applied: {source}")]
    PartialMutation {
        operation: MutationKind,
        applied: usize,
        requested: usize,
        #[source]
        source: RemoteError,
    },
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Transport(msg) => Self::Transport(msg),
            RemoteError::Validation(msg) => Self::Validation(msg),
        }
    }
}

/// Tunables for a sync run. Validated before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub max_snapshot_size: usize,
    /// Rolling window in seconds. `None` disables eviction.
    pub max_age_seconds: Option<u64>,
    pub resolve_batch_size: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_snapshot_size: DEFAULT_MAX_SNAPSHOT_SIZE,
            max_age_seconds: None,
            resolve_batch_size: DEFAULT_RESOLVE_BATCH_SIZE,
        }
    }
}

impl SyncOptions {
    pub fn with_max_age_seconds(mut self, seconds: u64) -> Self {
        self.max_age_seconds = Some(seconds);
        self
    }

    pub fn with_max_snapshot_size(mut self, size: usize) -> Self {
        self.max_snapshot_size = size;
        self
    }

    pub fn with_resolve_batch_size(mut self, size: usize) -> Self {
        self.resolve_batch_size = size;
        self
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.max_snapshot_size == 0 {
            return Err(SyncError::Configuration(
                "max snapshot size must be greater than zero".into(),
            ));
        }
        if self.resolve_batch_size == 0 {
            return Err(SyncError::Configuration(
                "resolve batch size must be greater than zero".into(),
            ));
        }
        if self.max_age_seconds == Some(0) {
            return Err(SyncError::Configuration(
                "rolling window must be at least one second".into(),
            ));
        }
        Ok(())
    }
}

/// Reconciles candidate tracks against a remote playlist.
///
/// Each run fetches a fresh snapshot, optionally evicts entries older than
/// the rolling window, filters candidates by approximate identity, resolves
/// the survivors against the catalog, filters again by exact identity and
/// appends what is left.
pub struct SyncEngine {
    provider: Arc<dyn PlaylistProvider>,
    options: SyncOptions,
}

impl SyncEngine {
    pub fn new(provider: Arc<dyn PlaylistProvider>, options: SyncOptions) -> Self {
        Self { provider, options }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub async fn run(&self, candidates: &[Track]) -> Result<SyncResult, SyncError> {
        self.run_at(candidates, Utc::now()).await
    }

    /// Run with an explicit notion of "now" for the rolling window.
    pub async fn run_at(
        &self,
        candidates: &[Track],
        now: DateTime<Utc>,
    ) -> Result<SyncResult, SyncError> {
        self.options.validate()?;
        let provider = self.provider.as_ref();

        let snapshot = fetch_snapshot(provider, self.options.max_snapshot_size).await?;
        tracing::info!(
            playlist = provider.label(),
            entries = snapshot.len(),
            "fetched playlist snapshot"
        );

        let (snapshot, deleted) = match self.options.max_age_seconds {
            Some(max_age) => evict_expired(provider, snapshot, max_age, now).await?,
            None => (snapshot, 0),
        };

        let survivors = dedup::filter_by_approximate_identity(candidates, &snapshot, normalize);
        tracing::debug!(
            candidates = candidates.len(),
            survivors = survivors.len(),
            "approximate dedup pass"
        );
        if survivors.is_empty() {
            return Ok(SyncResult { added: 0, deleted });
        }

        let resolved =
            resolve_identities(provider, &survivors, self.options.resolve_batch_size).await?;
        let fresh = dedup::filter_by_exact_identity(resolved, &snapshot);
        tracing::debug!(new = fresh.len(), "exact dedup pass");
        if fresh.is_empty() {
            return Ok(SyncResult { added: 0, deleted });
        }

        let ids: Vec<TrackId> = fresh.into_iter().map(|r| r.id).collect();
        let added = BatchMutator::new(provider).add_all(&ids).await?;
        tracing::info!(playlist = provider.label(), added, deleted, "sync complete");

        Ok(SyncResult { added, deleted })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use crate::test_support::InMemoryPlaylist;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn engine(playlist: &Arc<InMemoryPlaylist>, options: SyncOptions) -> SyncEngine {
        SyncEngine::new(Arc::clone(playlist) as Arc<dyn PlaylistProvider>, options)
    }

    #[tokio::test]
    async fn adds_only_tracks_missing_from_playlist() {
        let mut playlist = InMemoryPlaylist::new("recent");
        playlist.push(Track::new("A", "X").with_provider_id("id1"));
        playlist.push(Track::new("B", "Y").with_provider_id("id2"));
        playlist.add_playable("C", "Z", "id3");
        let playlist = Arc::new(playlist);

        let candidates = vec![Track::new("A", "X"), Track::new("C", "Z")];
        let result = engine(&playlist, SyncOptions::default())
            .run_at(&candidates, now())
            .await
            .unwrap();

        assert_eq!(result, SyncResult { added: 1, deleted: 0 });
        assert_eq!(playlist.calls().searches, vec![("C".into(), "Z".into())]);
        assert_eq!(playlist.calls().adds, vec![vec![TrackId::new("id3")]]);
    }

    #[tokio::test]
    async fn second_run_adds_nothing() {
        let mut playlist = InMemoryPlaylist::new("recent");
        playlist.add_playable("Song One", "Band", "id1");
        playlist.add_playable("Song Two", "Band", "id2");
        let playlist = Arc::new(playlist);

        let candidates = vec![Track::new("Song One", "Band"), Track::new("Song Two", "Band")];
        let engine = engine(&playlist, SyncOptions::default());

        let first = engine.run_at(&candidates, now()).await.unwrap();
        assert_eq!(first.added, 2);

        let second = engine.run_at(&candidates, now()).await.unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(playlist.items().len(), 2);
    }

    #[tokio::test]
    async fn case_and_whitespace_drift_skips_resolution() {
        let mut playlist = InMemoryPlaylist::new("recent");
        playlist.push(Track::new("Hey Jude", "The Beatles").with_provider_id("id1"));
        let playlist = Arc::new(playlist);

        let candidates = vec![Track::new("  hey jude", "THE BEATLES ")];
        let result = engine(&playlist, SyncOptions::default())
            .run_at(&candidates, now())
            .await
            .unwrap();

        assert_eq!(result.added, 0);
        assert!(playlist.calls().searches.is_empty());
        assert!(playlist.calls().adds.is_empty());
    }

    #[tokio::test]
    async fn spelling_drift_caught_by_exact_identity() {
        let mut playlist = InMemoryPlaylist::new("recent");
        playlist.push(Track::new("Song (Remastered)", "Band").with_provider_id("id1"));
        playlist.add_playable("Song", "Band", "id1");
        let playlist = Arc::new(playlist);

        let result = engine(&playlist, SyncOptions::default())
            .run_at(&[Track::new("Song", "Band")], now())
            .await
            .unwrap();

        assert_eq!(result.added, 0);
        assert_eq!(playlist.calls().searches.len(), 1);
        assert!(playlist.calls().adds.is_empty());
    }

    #[tokio::test]
    async fn rolling_window_evicts_old_entries() {
        let mut playlist = InMemoryPlaylist::new("recent");
        playlist.push(
            Track::new("D", "W")
                .with_provider_id("id4")
                .with_added_at(now() - Duration::seconds(864_000)),
        );
        playlist.push(
            Track::new("E", "V")
                .with_provider_id("id5")
                .with_added_at(now() - Duration::seconds(60)),
        );
        let playlist = Arc::new(playlist);

        let options = SyncOptions::default().with_max_age_seconds(604_800);
        let result = engine(&playlist, options).run_at(&[], now()).await.unwrap();

        assert_eq!(result, SyncResult { added: 0, deleted: 1 });
        assert_eq!(playlist.calls().deletes, vec![vec![TrackId::new("id4")]]);
        assert_eq!(playlist.items().len(), 1);
    }

    #[tokio::test]
    async fn evicted_track_can_be_added_back() {
        let mut playlist = InMemoryPlaylist::new("recent");
        playlist.push(
            Track::new("D", "W")
                .with_provider_id("id4")
                .with_added_at(now() - Duration::days(10)),
        );
        playlist.add_playable("D", "W", "id4");
        let playlist = Arc::new(playlist);

        let options = SyncOptions::default().with_max_age_seconds(604_800);
        let result = engine(&playlist, options)
            .run_at(&[Track::new("D", "W")], now())
            .await
            .unwrap();

        assert_eq!(result, SyncResult { added: 1, deleted: 1 });
    }

    #[tokio::test]
    async fn duplicate_of_evicted_entry_is_re_added() {
        let mut playlist = InMemoryPlaylist::new("recent");
        playlist.push(
            Track::new("S", "B")
                .with_provider_id("idX")
                .with_added_at(now() - Duration::days(10)),
        );
        playlist.push(
            Track::new("S", "B")
                .with_provider_id("idX")
                .with_added_at(now() - Duration::days(1)),
        );
        playlist.add_playable("S", "B", "idX");
        let playlist = Arc::new(playlist);

        let options = SyncOptions::default().with_max_age_seconds(604_800);
        let result = engine(&playlist, options)
            .run_at(&[Track::new("S", "B")], now())
            .await
            .unwrap();

        assert_eq!(result, SyncResult { added: 1, deleted: 1 });
        assert_eq!(playlist.calls().deletes, vec![vec![TrackId::new("idX")]]);
        assert_eq!(playlist.calls().adds, vec![vec![TrackId::new("idX")]]);
    }

    #[tokio::test]
    async fn resolves_in_bounded_batches() {
        let mut playlist = InMemoryPlaylist::new("recent");
        let mut candidates = Vec::new();
        for i in 0..25 {
            let name = format!("Song {i}");
            playlist.add_playable(&name, "Band", &format!("id{i}"));
            candidates.push(Track::new(name, "Band"));
        }
        let playlist = Arc::new(playlist);

        let result = engine(&playlist, SyncOptions::default())
            .run_at(&candidates, now())
            .await
            .unwrap();

        assert_eq!(result.added, 25);
        let concurrency = playlist.calls().search_concurrency;
        assert_eq!(concurrency.len(), 25);
        assert_eq!(concurrency.iter().max(), Some(&20));
        assert_eq!(&concurrency[20..], &[1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn unresolvable_candidates_are_dropped() {
        let mut playlist = InMemoryPlaylist::new("recent");
        playlist.add_playable("Known", "Band", "id1");
        let playlist = Arc::new(playlist);

        let candidates = vec![Track::new("Known", "Band"), Track::new("Unknown", "Band")];
        let result = engine(&playlist, SyncOptions::default())
            .run_at(&candidates, now())
            .await
            .unwrap();

        assert_eq!(result.added, 1);
    }

    #[tokio::test]
    async fn invalid_options_fail_before_network() {
        let playlist = Arc::new(InMemoryPlaylist::new("recent"));
        let options = SyncOptions::default().with_resolve_batch_size(0);

        let result = engine(&playlist, options).run_at(&[], now()).await;

        assert!(matches!(result, Err(SyncError::Configuration(_))));
        assert!(playlist.calls().page_offsets.is_empty());
    }

    #[tokio::test]
    async fn failed_add_chunk_reports_partial_mutation() {
        let mut playlist = InMemoryPlaylist::new("recent").with_mutation_limit(2);
        let mut candidates = Vec::new();
        for i in 0..5 {
            let name = format!("Song {i}");
            playlist.add_playable(&name, "Band", &format!("id{i}"));
            candidates.push(Track::new(name, "Band"));
        }
        playlist.fail_add_call(1);
        let playlist = Arc::new(playlist);

        let err = engine(&playlist, SyncOptions::default())
            .run_at(&candidates, now())
            .await
            .unwrap_err();

        match err {
            SyncError::PartialMutation {
                operation,
                applied,
                requested,
                ..
            } => {
                assert_eq!(operation, MutationKind::Add);
                assert_eq!(applied, 2);
                assert_eq!(requested, 5);
            }
            other => panic!("expected PartialMutation, got {other:?}"),
        }
        assert_eq!(playlist.items().len(), 2);
        assert_eq!(playlist.calls().adds.len(), 2);
    }

    #[tokio::test]
    async fn snapshot_failure_aborts_run() {
        let mut playlist = InMemoryPlaylist::new("recent");
        playlist.fail_page_at(0);
        let playlist = Arc::new(playlist);

        let result = engine(&playlist, SyncOptions::default())
            .run_at(&[Track::new("A", "X")], now())
            .await;

        assert!(matches!(result, Err(SyncError::Transport(_))));
        assert!(playlist.calls().searches.is_empty());
    }

    #[test]
    fn remote_validation_maps_to_validation() {
        let err: SyncError = RemoteError::Validation("missing field `items`".into()).into();
        assert!(matches!(err, SyncError::Validation(_)));
    }
}
