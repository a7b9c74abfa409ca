//! In-memory ratings cache
//!
//! Holds the current [`CacheSnapshot`] behind an `Arc`. Publishing swaps the
//! pointer, so the lock is only ever held for a clone or a swap and readers
//! keep whichever snapshot they grabbed for as long as they need it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::types::{CacheSnapshot, CacheStatus, EpisodeMapping, RatingsMapping};

pub struct CacheStore {
    current: RwLock<Arc<CacheSnapshot>>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore {
    /// Create a store holding the empty snapshot
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(CacheSnapshot::default())),
        }
    }

    /// The currently published snapshot
    pub async fn current_snapshot(&self) -> Arc<CacheSnapshot> {
        self.current.read().await.clone()
    }

    /// Atomically replace the current snapshot with one built from both mappings.
    pub async fn publish(
        &self,
        ratings: RatingsMapping,
        episodes: EpisodeMapping,
        timestamp: DateTime<Utc>,
    ) -> Arc<CacheSnapshot> {
        let snapshot = Arc::new(CacheSnapshot::new(ratings, episodes, timestamp));
        let previous = std::mem::replace(&mut *self.current.write().await, snapshot.clone());

        tracing::info!(
            "Published cache snapshot: {} ratings, {} episodes (previous: {} ratings, {} episodes)",
            snapshot.ratings_count,
            snapshot.episodes_count,
            previous.ratings_count,
            previous.episodes_count
        );

        // `previous` is freed here unless a reader still holds it.
        snapshot
    }

    pub async fn is_loaded(&self) -> bool {
        self.current_snapshot().await.is_loaded()
    }

    pub async fn status(&self) -> CacheStatus {
        let snapshot = self.current_snapshot().await;
        CacheStatus {
            data_loaded: snapshot.is_loaded(),
            last_updated: snapshot.last_updated,
            ratings_count: snapshot.ratings_count,
            episodes_count: snapshot.episodes_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::imdb::types::{EpisodeKey, RatingRecord};

    fn record(id: &str, rating: &str) -> RatingRecord {
        RatingRecord {
            title_id: id.to_string(),
            rating: rating.to_string(),
            vote_count: "1".to_string(),
        }
    }

    fn cycle(n: u32) -> (RatingsMapping, EpisodeMapping) {
        let episode_id = format!("tt{}", n);
        let mut ratings = RatingsMapping::new();
        ratings.insert(episode_id.clone(), record(&episode_id, "5.0"));
        let mut episodes = EpisodeMapping::new();
        episodes.insert(EpisodeKey::new("tt0", "1", "1"), episode_id);
        (ratings, episodes)
    }

    #[tokio::test]
    async fn test_starts_empty() {
        let store = CacheStore::new();
        let snapshot = store.current_snapshot().await;
        assert!(snapshot.ratings.is_empty());
        assert!(snapshot.episodes.is_empty());
        assert!(snapshot.last_updated.is_none());
        assert!(!store.is_loaded().await);

        let status = store.status().await;
        assert!(!status.data_loaded);
        assert_eq!(status.ratings_count, 0);
    }

    #[tokio::test]
    async fn test_publish_replaces_wholesale() {
        let store = CacheStore::new();
        let (ratings, episodes) = cycle(1);
        let now = Utc::now();
        store.publish(ratings, episodes, now).await;

        let status = store.status().await;
        assert!(status.data_loaded);
        assert_eq!(status.last_updated, Some(now));
        assert_eq!(status.ratings_count, 1);
        assert_eq!(status.episodes_count, 1);

        let (ratings, episodes) = cycle(2);
        store.publish(ratings, episodes, Utc::now()).await;
        let snapshot = store.current_snapshot().await;
        assert!(snapshot.ratings.contains_key("tt2"));
        assert!(!snapshot.ratings.contains_key("tt1"));
    }

    #[tokio::test]
    async fn test_loaded_requires_both_mappings() {
        let store = CacheStore::new();
        let (ratings, _) = cycle(1);
        store.publish(ratings, EpisodeMapping::new(), Utc::now()).await;
        assert!(!store.is_loaded().await);
    }

    #[tokio::test]
    async fn test_reader_keeps_old_snapshot_alive() {
        let store = CacheStore::new();
        let (ratings, episodes) = cycle(1);
        store.publish(ratings, episodes, Utc::now()).await;

        let held = store.current_snapshot().await;
        let (ratings, episodes) = cycle(2);
        store.publish(ratings, episodes, Utc::now()).await;

        assert!(held.ratings.contains_key("tt1"));
        assert!(store.current_snapshot().await.ratings.contains_key("tt2"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_readers_never_see_mixed_cycles() {
        let store = Arc::new(CacheStore::new());
        let (ratings, episodes) = cycle(0);
        store.publish(ratings, episodes, Utc::now()).await;

        let mut readers = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..2_000 {
                    let snapshot = store.current_snapshot().await;
                    let episode_id = &snapshot.episodes[&EpisodeKey::new("tt0", "1", "1")];
                    // The mapped episode always has a rating in the same snapshot.
                    assert!(snapshot.ratings.contains_key(episode_id));
                    tokio::task::yield_now().await;
                }
            }));
        }

        for n in 1..=200 {
            let (ratings, episodes) = cycle(n);
            store.publish(ratings, episodes, Utc::now()).await;
            tokio::task::yield_now().await;
        }

        for reader in readers {
            reader.await.unwrap();
        }
    }
}
