use serde::{Deserialize, Serialize};

/// Every title, series and episode identifier starts with this prefix.
pub const TITLE_ID_PREFIX: &str = "tt";

/// Returns true if `id` has the expected identifier shape.
///
/// Identifiers are opaque: only the prefix is checked, the numeric
/// suffix is never parsed.
pub fn is_title_id(id: &str) -> bool {
    id.starts_with(TITLE_ID_PREFIX)
}

/// How a rating was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingKind {
    /// Rating of the requested title itself
    Direct,
    /// Rating of an episode resolved through the episode mapping
    Episode,
    /// Series rating shown because the episode had none
    SeriesFallback,
}

impl RatingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatingKind::Direct => "direct",
            RatingKind::Episode => "episode",
            RatingKind::SeriesFallback => "series_fallback",
        }
    }
}

impl std::fmt::Display for RatingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a well-formed lookup found nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundReason {
    /// The title has no rating
    TitleNotRated,
    /// No episode is known for (series, season, episode)
    EpisodeNotMapped,
    /// The episode is known but has no rating
    EpisodeNotRated,
}

impl NotFoundReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotFoundReason::TitleNotRated => "title_not_rated",
            NotFoundReason::EpisodeNotMapped => "episode_not_mapped",
            NotFoundReason::EpisodeNotRated => "episode_not_rated",
        }
    }
}

impl std::fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Body of `GET /api/rating/{titleId}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleRating {
    pub title_id: String,
    /// One fractional digit, e.g. "9.3"
    pub rating: String,
    pub vote_count: String,
    pub kind: RatingKind,
}

/// Body of `GET /api/episode/{seriesId}/{season}/{episode}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRating {
    pub series_id: String,
    pub season: String,
    pub episode: String,
    pub episode_id: String,
    pub rating: String,
    pub vote_count: String,
    pub kind: RatingKind,
}

/// Error body for 400 and 404 responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<NotFoundReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            reason: None,
            title_id: None,
            series_id: None,
            season: None,
            episode: None,
            episode_id: None,
        }
    }
}
