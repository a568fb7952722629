use crate::playlist::PlaylistProvider;
use crate::sync::{MutationKind, SyncError};
use crate::track::TrackId;

/// Issues add and delete calls in provider-limited chunks.
///
/// Chunks are sent one at a time, in order; mutating calls against the
/// same playlist never overlap. A failed chunk stops the sequence and
/// chunks already applied stay applied.
pub struct BatchMutator<'a> {
    provider: &'a dyn PlaylistProvider,
}

impl<'a> BatchMutator<'a> {
    pub fn new(provider: &'a dyn PlaylistProvider) -> Self {
        Self { provider }
    }

    /// Append `ids` to the playlist. Returns the number of ids confirmed added.
    pub async fn add_all(&self, ids: &[TrackId]) -> Result<usize, SyncError> {
        self.apply(MutationKind::Add, ids).await
    }

    /// Remove `ids` from the playlist. Returns the number of ids confirmed removed.
    pub async fn delete_all(&self, ids: &[TrackId]) -> Result<usize, SyncError> {
        self.apply(MutationKind::Delete, ids).await
    }

    async fn apply(&self, operation: MutationKind, ids: &[TrackId]) -> Result<usize, SyncError> {
        let limit = self.provider.mutation_limit();
        if limit == 0 {
            return Err(SyncError::Configuration(format!(
                "playlist provider {} reports a zero mutation limit",
                self.provider.label()
            )));
        }

        let mut applied = 0;

        for chunk in ids.chunks(limit) {
            let result = match operation {
                MutationKind::Add => self.provider.add_tracks(chunk).await,
                MutationKind::Delete => self.provider.delete_tracks(chunk).await,
            };

            if let Err(source) = result {
                tracing::warn!(
                    playlist = self.provider.label(),
                    %operation,
                    applied,
                    requested = ids.len(),
                    "mutation chunk failed: {source}"
                );
                if applied == 0 {
                    return Err(source.into());
                }
                return Err(SyncError::PartialMutation {
                    operation,
                    applied,
                    requested: ids.len(),
                    source,
                });
            }

            applied += chunk.len();
        }

        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::InMemoryPlaylist;

    use super::*;

    fn ids(count: usize) -> Vec<TrackId> {
        (0..count).map(|i| TrackId::new(format!("id{i}"))).collect()
    }

    #[tokio::test]
    async fn chunks_to_mutation_limit() {
        let playlist = InMemoryPlaylist::new("test").with_mutation_limit(100);

        let added = BatchMutator::new(&playlist).add_all(&ids(250)).await.unwrap();

        assert_eq!(added, 250);
        let sizes: Vec<usize> = playlist.calls().adds.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[tokio::test]
    async fn evenly_divisible_last_chunk_is_full() {
        let playlist = InMemoryPlaylist::new("test").with_mutation_limit(100);

        BatchMutator::new(&playlist).add_all(&ids(200)).await.unwrap();

        let sizes: Vec<usize> = playlist.calls().adds.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100]);
    }

    #[tokio::test]
    async fn chunks_preserve_order() {
        let playlist = InMemoryPlaylist::new("test").with_mutation_limit(2);

        BatchMutator::new(&playlist).delete_all(&ids(3)).await.unwrap();

        assert_eq!(
            playlist.calls().deletes,
            vec![ids(2), vec![TrackId::new("id2")]]
        );
    }

    #[tokio::test]
    async fn empty_input_issues_no_calls() {
        let playlist = InMemoryPlaylist::new("test");

        let added = BatchMutator::new(&playlist).add_all(&[]).await.unwrap();

        assert_eq!(added, 0);
        assert!(playlist.calls().adds.is_empty());
    }

    #[tokio::test]
    async fn first_chunk_failure_is_plain_error() {
        let mut playlist = InMemoryPlaylist::new("test").with_mutation_limit(2);
        playlist.fail_add_call(0);

        let result = BatchMutator::new(&playlist).add_all(&ids(5)).await;

        assert!(matches!(result, Err(SyncError::Transport(_))));
        assert_eq!(playlist.calls().adds.len(), 1);
    }

    #[tokio::test]
    async fn later_chunk_failure_aborts_remaining_chunks() {
        let mut playlist = InMemoryPlaylist::new("test").with_mutation_limit(2);
        playlist.fail_add_call(1);

        let result = BatchMutator::new(&playlist).add_all(&ids(6)).await;

        assert!(matches!(
            result,
            Err(SyncError::PartialMutation {
                operation: MutationKind::Add,
                applied: 2,
                requested: 6,
                ..
            })
        ));
        assert_eq!(playlist.calls().adds.len(), 2);
    }
}
