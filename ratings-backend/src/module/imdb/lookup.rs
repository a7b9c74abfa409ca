//! Point lookups over the published snapshot
//!
//! Every call grabs one snapshot and resolves entirely against it, so an
//! episode is never matched with ratings from a different refresh cycle.

use std::sync::Arc;

use ratings_common::{is_title_id, NotFoundReason};

use super::cache::CacheStore;
use super::types::{CacheSnapshot, EpisodeKey, RatingRecord};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("invalid {field}: must start with \"tt\"")]
    InvalidArgument { field: &'static str },

    #[error("rating not found for {title_id}")]
    TitleNotRated { title_id: String },

    #[error("episode not found: {key}")]
    EpisodeNotMapped { key: EpisodeKey },

    #[error("rating not found for episode {episode_id}")]
    EpisodeNotRated { episode_id: String },
}

impl LookupError {
    /// `None` for invalid arguments
    pub fn not_found_reason(&self) -> Option<NotFoundReason> {
        match self {
            LookupError::InvalidArgument { .. } => None,
            LookupError::TitleNotRated { .. } => Some(NotFoundReason::TitleNotRated),
            LookupError::EpisodeNotMapped { .. } => Some(NotFoundReason::EpisodeNotMapped),
            LookupError::EpisodeNotRated { .. } => Some(NotFoundReason::EpisodeNotRated),
        }
    }
}

/// A rated episode: its own title id plus the rating
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeMatch {
    pub episode_id: String,
    pub record: RatingRecord,
}

#[derive(Clone)]
pub struct LookupEngine {
    store: Arc<CacheStore>,
}

impl LookupEngine {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self { store }
    }

    pub async fn lookup_title(&self, title_id: &str) -> Result<RatingRecord, LookupError> {
        let snapshot = self.store.current_snapshot().await;
        title_in(&snapshot, title_id)
    }

    pub async fn lookup_episode(
        &self,
        series_id: &str,
        season: &str,
        episode: &str,
    ) -> Result<EpisodeMatch, LookupError> {
        let snapshot = self.store.current_snapshot().await;
        episode_in(&snapshot, series_id, season, episode)
    }
}

fn title_in(snapshot: &CacheSnapshot, title_id: &str) -> Result<RatingRecord, LookupError> {
    if !is_title_id(title_id) {
        return Err(LookupError::InvalidArgument { field: "title id" });
    }

    snapshot
        .ratings
        .get(title_id)
        .cloned()
        .ok_or_else(|| LookupError::TitleNotRated {
            title_id: title_id.to_string(),
        })
}

fn episode_in(
    snapshot: &CacheSnapshot,
    series_id: &str,
    season: &str,
    episode: &str,
) -> Result<EpisodeMatch, LookupError> {
    if !is_title_id(series_id) {
        return Err(LookupError::InvalidArgument { field: "series id" });
    }

    let key = EpisodeKey::new(series_id, season, episode);
    let Some(episode_id) = snapshot.episodes.get(&key) else {
        return Err(LookupError::EpisodeNotMapped { key });
    };

    match snapshot.ratings.get(episode_id) {
        Some(record) => Ok(EpisodeMatch {
            episode_id: episode_id.clone(),
            record: record.clone(),
        }),
        None => Err(LookupError::EpisodeNotRated {
            episode_id: episode_id.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::imdb::types::{EpisodeMapping, RatingsMapping};
    use chrono::Utc;

    fn record(id: &str, rating: &str, votes: &str) -> RatingRecord {
        RatingRecord {
            title_id: id.to_string(),
            rating: rating.to_string(),
            vote_count: votes.to_string(),
        }
    }

    async fn engine() -> LookupEngine {
        let mut ratings = RatingsMapping::new();
        ratings.insert("tt0111161".to_string(), record("tt0111161", "9.3", "2800000"));
        ratings.insert("tt0579539".to_string(), record("tt0579539", "8.2", "41000"));
        ratings.insert("tt0903747".to_string(), record("tt0903747", "9.5", "2300000"));

        let mut episodes = EpisodeMapping::new();
        episodes.insert(EpisodeKey::new("tt0903747", "1", "1"), "tt0579539".to_string());
        episodes.insert(EpisodeKey::new("tt0903747", "1", "2"), "tt1054724".to_string());

        let store = Arc::new(CacheStore::new());
        store.publish(ratings, episodes, Utc::now()).await;
        LookupEngine::new(store)
    }

    #[tokio::test]
    async fn test_lookup_title_hit() {
        let engine = engine().await;
        let found = engine.lookup_title("tt0111161").await.unwrap();
        assert_eq!(found, record("tt0111161", "9.3", "2800000"));
    }

    #[tokio::test]
    async fn test_lookup_title_not_rated() {
        let engine = engine().await;
        let err = engine.lookup_title("tt0000000").await.unwrap_err();
        assert_eq!(err.not_found_reason(), Some(NotFoundReason::TitleNotRated));
    }

    #[tokio::test]
    async fn test_invalid_ids_are_invalid_argument_not_not_found() {
        let engine = engine().await;
        for bad in ["xx123", "", "0111161", "TT0111161"] {
            let err = engine.lookup_title(bad).await.unwrap_err();
            assert!(matches!(err, LookupError::InvalidArgument { .. }), "{bad}");
            assert_eq!(err.not_found_reason(), None);

            let err = engine.lookup_episode(bad, "1", "1").await.unwrap_err();
            assert!(matches!(err, LookupError::InvalidArgument { .. }), "{bad}");
        }
    }

    #[tokio::test]
    async fn test_lookup_episode_hit() {
        let engine = engine().await;
        let found = engine.lookup_episode("tt0903747", "1", "1").await.unwrap();
        assert_eq!(found.episode_id, "tt0579539");
        assert_eq!(found.record.rating, "8.2");
        assert_eq!(found.record.vote_count, "41000");
    }

    #[tokio::test]
    async fn test_episode_not_found_variants_are_distinct() {
        let engine = engine().await;

        let unmapped = engine.lookup_episode("tt0903747", "9", "9").await.unwrap_err();
        assert_eq!(
            unmapped,
            LookupError::EpisodeNotMapped {
                key: EpisodeKey::new("tt0903747", "9", "9")
            }
        );
        assert_eq!(unmapped.not_found_reason(), Some(NotFoundReason::EpisodeNotMapped));

        let unrated = engine.lookup_episode("tt0903747", "1", "2").await.unwrap_err();
        assert_eq!(
            unrated,
            LookupError::EpisodeNotRated {
                episode_id: "tt1054724".to_string()
            }
        );
        assert_eq!(unrated.not_found_reason(), Some(NotFoundReason::EpisodeNotRated));
    }

    #[tokio::test]
    async fn test_season_and_episode_are_not_normalized() {
        let engine = engine().await;
        let err = engine.lookup_episode("tt0903747", "01", "01").await.unwrap_err();
        assert!(matches!(err, LookupError::EpisodeNotMapped { .. }));
    }

    #[tokio::test]
    async fn test_series_fallback_is_independent_lookup() {
        let engine = engine().await;
        assert!(engine.lookup_episode("tt0903747", "9", "9").await.is_err());
        let series = engine.lookup_title("tt0903747").await.unwrap();
        assert_eq!(series.rating, "9.5");
    }

    #[tokio::test]
    async fn test_empty_cache_is_not_found() {
        let engine = LookupEngine::new(Arc::new(CacheStore::new()));
        assert!(matches!(
            engine.lookup_title("tt0111161").await,
            Err(LookupError::TitleNotRated { .. })
        ));
        assert!(matches!(
            engine.lookup_episode("tt0903747", "1", "1").await,
            Err(LookupError::EpisodeNotMapped { .. })
        ));
    }
}
