use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{CatalogTrack, Page, PlaylistProvider, RemoteError, Track, TrackId, TrackSource};

/// Every call an `InMemoryPlaylist` has received, in order.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    pub page_offsets: Vec<usize>,
    pub searches: Vec<(String, String)>,
    /// Number of searches in flight (including this one) when each search started.
    pub search_concurrency: Vec<usize>,
    pub adds: Vec<Vec<TrackId>>,
    pub deletes: Vec<Vec<TrackId>>,
}

#[derive(Default)]
struct State {
    items: Vec<Track>,
    log: CallLog,
}

/// In-memory playlist and catalog for testing.
pub struct InMemoryPlaylist {
    label: String,
    page_size: usize,
    mutation_limit: usize,
    catalog: Vec<(Track, CatalogTrack)>,
    fail_searches: HashSet<String>,
    fail_add_call: Option<usize>,
    fail_page_offset: Option<usize>,
    in_flight: AtomicUsize,
    state: Mutex<State>,
}

impl InMemoryPlaylist {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            page_size: 50,
            mutation_limit: 100,
            catalog: Vec::new(),
            fail_searches: HashSet::new(),
            fail_add_call: None,
            fail_page_offset: None,
            in_flight: AtomicUsize::new(0),
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_mutation_limit(mut self, limit: usize) -> Self {
        self.mutation_limit = limit;
        self
    }

    /// Seed an existing playlist entry.
    pub fn push(&mut self, track: Track) {
        self.state.get_mut().unwrap().items.push(track);
    }

    /// Register a catalog entry that searches for `name`/`artist` will return.
    pub fn add_catalog(&mut self, name: &str, artist: &str, hit: CatalogTrack) {
        self.catalog.push((Track::new(name, artist), hit));
    }

    /// Register a playable, non-local catalog entry.
    pub fn add_playable(&mut self, name: &str, artist: &str, id: &str) {
        self.add_catalog(
            name,
            artist,
            CatalogTrack {
                id: TrackId::new(id),
                is_playable: true,
                is_local: false,
            },
        );
    }

    /// Make searches for this track name fail.
    pub fn fail_search_for(&mut self, name: &str) {
        self.fail_searches.insert(name.to_owned());
    }

    /// Make the n-th (zero-based) add call fail.
    pub fn fail_add_call(&mut self, index: usize) {
        self.fail_add_call = Some(index);
    }

    /// Make the page request at this offset fail.
    pub fn fail_page_at(&mut self, offset: usize) {
        self.fail_page_offset = Some(offset);
    }

    pub fn items(&self) -> Vec<Track> {
        self.state.lock().unwrap().items.clone()
    }

    pub fn calls(&self) -> CallLog {
        self.state.lock().unwrap().log.clone()
    }
}

#[async_trait::async_trait]
impl PlaylistProvider for InMemoryPlaylist {
    fn label(&self) -> &str {
        &self.label
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn mutation_limit(&self) -> usize {
        self.mutation_limit
    }

    async fn list_page(&self, offset: usize) -> Result<Page, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.log.page_offsets.push(offset);

        if self.fail_page_offset == Some(offset) {
            return Err(RemoteError::Transport(format!("HTTP 503 at offset {offset}")));
        }

        let items: Vec<Track> = state
            .items
            .iter()
            .skip(offset)
            .take(self.page_size)
            .cloned()
            .collect();

        Ok(Page {
            items,
            has_next: offset + self.page_size < state.items.len(),
        })
    }

    async fn search(&self, name: &str, artist: &str) -> Result<Vec<CatalogTrack>, RemoteError> {
        let level = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.lock().unwrap();
            state.log.searches.push((name.to_owned(), artist.to_owned()));
            state.log.search_concurrency.push(level);
        }

        // Let batch-mates start before this search settles.
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_searches.contains(name) {
            return Err(RemoteError::Transport(format!("search failed for {name}")));
        }

        Ok(self
            .catalog
            .iter()
            .filter(|(track, _)| track.name == name && track.artist == artist)
            .map(|(_, hit)| hit.clone())
            .collect())
    }

    async fn add_tracks(&self, ids: &[TrackId]) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        let call = state.log.adds.len();
        state.log.adds.push(ids.to_vec());

        if self.fail_add_call == Some(call) {
            return Err(RemoteError::Transport("HTTP 502 Bad Gateway".into()));
        }

        for id in ids {
            let (name, artist) = self
                .catalog
                .iter()
                .find(|(_, hit)| &hit.id == id)
                .map(|(track, _)| (track.name.clone(), track.artist.clone()))
                .unwrap_or_default();
            state
                .items
                .push(Track::new(name, artist).with_provider_id(id.as_str()));
        }
        Ok(())
    }

    async fn delete_tracks(&self, ids: &[TrackId]) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.log.deletes.push(ids.to_vec());
        state
            .items
            .retain(|track| track.provider_id.as_ref().is_none_or(|id| !ids.contains(id)));
        Ok(())
    }
}

/// Track source returning a fixed list.
pub struct StaticSource {
    label: String,
    tracks: Vec<Track>,
}

impl StaticSource {
    pub fn new(label: impl Into<String>, tracks: Vec<Track>) -> Self {
        Self {
            label: label.into(),
            tracks,
        }
    }
}

#[async_trait::async_trait]
impl TrackSource for StaticSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn list_tracks(&self) -> Result<Vec<Track>, RemoteError> {
        Ok(self.tracks.clone())
    }
}
