//! IMDb dataset data types

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The datasets' marker for "value intentionally absent"
pub const NULL_SENTINEL: &str = "\\N";

/// One rated title
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingRecord {
    /// e.g. "tt0111161"
    pub title_id: String,
    /// Always one fractional digit, e.g. "9.3"
    pub rating: String,
    /// Non-negative integer as text, "0" when the source had none
    pub vote_count: String,
}

/// (series, season, episode) exactly as they appear in the dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EpisodeKey {
    pub series_id: String,
    pub season: String,
    pub episode: String,
}

impl EpisodeKey {
    pub fn new(
        series_id: impl Into<String>,
        season: impl Into<String>,
        episode: impl Into<String>,
    ) -> Self {
        Self {
            series_id: series_id.into(),
            season: season.into(),
            episode: episode.into(),
        }
    }
}

impl fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.series_id, self.season, self.episode)
    }
}

/// titleId → rating
pub type RatingsMapping = HashMap<String, RatingRecord>;

/// (series, season, episode) → episode titleId
pub type EpisodeMapping = HashMap<EpisodeKey, String>;

/// One published refresh result. Never mutated after construction.
#[derive(Debug, Default)]
pub struct CacheSnapshot {
    pub ratings: RatingsMapping,
    pub episodes: EpisodeMapping,
    /// None until the first successful refresh
    pub last_updated: Option<DateTime<Utc>>,
    pub ratings_count: usize,
    pub episodes_count: usize,
}

impl CacheSnapshot {
    pub fn new(
        ratings: RatingsMapping,
        episodes: EpisodeMapping,
        last_updated: DateTime<Utc>,
    ) -> Self {
        let ratings_count = ratings.len();
        let episodes_count = episodes.len();
        Self {
            ratings,
            episodes,
            last_updated: Some(last_updated),
            ratings_count,
            episodes_count,
        }
    }

    pub fn is_loaded(&self) -> bool {
        !self.ratings.is_empty() && !self.episodes.is_empty()
    }
}

/// Load state of the cache, as shown by the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub data_loaded: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub ratings_count: usize,
    pub episodes_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_key_display() {
        let key = EpisodeKey::new("tt0903747", "1", "1");
        assert_eq!(key.to_string(), "tt0903747:1:1");
    }

    #[test]
    fn test_episode_key_fields_do_not_collide() {
        // A joined "a:b:c" string key would make these equal.
        let a = EpisodeKey::new("tt1:2", "3", "4");
        let b = EpisodeKey::new("tt1", "2:3", "4");
        assert_ne!(a, b);
    }

    #[test]
    fn test_snapshot_counts_and_load_state() {
        assert!(!CacheSnapshot::default().is_loaded());

        let mut ratings = RatingsMapping::new();
        ratings.insert(
            "tt1".to_string(),
            RatingRecord {
                title_id: "tt1".to_string(),
                rating: "7.0".to_string(),
                vote_count: "10".to_string(),
            },
        );
        let snapshot = CacheSnapshot::new(ratings.clone(), EpisodeMapping::new(), Utc::now());
        assert_eq!(snapshot.ratings_count, 1);
        assert_eq!(snapshot.episodes_count, 0);
        assert!(!snapshot.is_loaded());

        let mut episodes = EpisodeMapping::new();
        episodes.insert(EpisodeKey::new("tt2", "1", "1"), "tt1".to_string());
        let snapshot = CacheSnapshot::new(ratings, episodes, Utc::now());
        assert!(snapshot.is_loaded());
    }
}
