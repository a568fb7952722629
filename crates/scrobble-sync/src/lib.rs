pub mod dedup;
pub mod evict;
pub mod mutate;
pub mod playlist;
pub mod resolve;
pub mod snapshot;
pub mod source;
pub mod sync;
pub mod track;

pub use mutate::BatchMutator;
pub use playlist::{Page, PlaylistProvider};
pub use snapshot::{Snapshot, fetch_snapshot};
pub use source::{RemoteError, TrackSource};
pub use sync::{MutationKind, SyncEngine, SyncError, SyncOptions};
pub use track::{CatalogTrack, Resolved, SyncResult, Track, TrackId, TrackKey, normalize};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
