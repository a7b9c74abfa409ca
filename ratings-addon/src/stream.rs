//! Rating resolution and Stremio stream formatting
//!
//! Series episodes are looked up first; when that misses, the series' own
//! rating is shown instead and labelled as such.

use serde::Serialize;

use ratings_common::RatingKind;

use crate::backend::RatingsApi;

const STREAM_NAME: &str = "📊 IMDb Rating";
const RULE: &str = "───────────────";
const IMDB_TITLE_URL: &str = "https://www.imdb.com/title";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorHints {
    pub not_web_ready: bool,
    pub binge_group: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub name: String,
    pub description: String,
    pub external_url: String,
    pub behavior_hints: BehaviorHints,
    #[serde(rename = "type")]
    pub stream_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamResponse {
    pub streams: Vec<Stream>,
}

/// A rating ready to display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRating {
    pub rating: String,
    pub vote_count: String,
    pub kind: RatingKind,
    /// Title the IMDb link points at
    pub link_id: String,
}

/// `tt…:season:episode`, all three parts non-empty
pub fn parse_episode_id(id: &str) -> Option<(&str, &str, &str)> {
    let mut parts = id.split(':');
    let series_id = parts.next().filter(|p| !p.is_empty())?;
    let season = parts.next().filter(|p| !p.is_empty())?;
    let episode = parts.next().filter(|p| !p.is_empty())?;
    Some((series_id, season, episode))
}

/// Direct rating of `title_id`. Backend errors count as a miss.
pub async fn resolve_title(api: &dyn RatingsApi, title_id: &str) -> Option<ResolvedRating> {
    match api.title_rating(title_id).await {
        Ok(Some(rating)) => Some(ResolvedRating {
            rating: rating.rating,
            vote_count: rating.vote_count,
            kind: RatingKind::Direct,
            link_id: rating.title_id,
        }),
        Ok(None) => {
            tracing::debug!("No rating for {}", title_id);
            None
        }
        Err(e) => {
            tracing::warn!("Title lookup for {} failed: {}", title_id, e);
            None
        }
    }
}

/// Episode rating, falling back to the series rating.
pub async fn resolve_episode(
    api: &dyn RatingsApi,
    series_id: &str,
    season: &str,
    episode: &str,
) -> Option<ResolvedRating> {
    match api.episode_rating(series_id, season, episode).await {
        Ok(Some(rating)) => {
            return Some(ResolvedRating {
                rating: rating.rating,
                vote_count: rating.vote_count,
                kind: RatingKind::Episode,
                link_id: rating.episode_id,
            });
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!("Episode lookup for {}:{}:{} failed: {}", series_id, season, episode, e);
        }
    }

    tracing::debug!(
        "No episode rating for {}:{}:{}, trying series rating",
        series_id,
        season,
        episode
    );
    let mut fallback = resolve_title(api, series_id).await?;
    fallback.kind = RatingKind::SeriesFallback;
    Some(fallback)
}

fn rating_description(rating: &ResolvedRating) -> String {
    let mut lines = vec![
        RULE.to_string(),
        format!("⭐ IMDb        : {}/10 ({} votes)", rating.rating, rating.vote_count),
    ];
    match rating.kind {
        RatingKind::Episode => lines.push("(Episode Rating)".to_string()),
        RatingKind::SeriesFallback => lines.push("(Series Rating)".to_string()),
        RatingKind::Direct => {}
    }
    lines.push(RULE.to_string());
    lines.join("\n")
}

fn rating_stream(request_id: &str, description: String, link_id: &str) -> Stream {
    Stream {
        name: STREAM_NAME.to_string(),
        description,
        external_url: format!("{}/{}/", IMDB_TITLE_URL, link_id),
        behavior_hints: BehaviorHints {
            not_web_ready: true,
            binge_group: format!("ratings-{}", request_id),
        },
        stream_type: "other".to_string(),
    }
}

/// The single stream shown for `id`: its rating, or "Not Available".
pub fn format_stream(
    request_id: &str,
    fallback_link_id: &str,
    rating: Option<&ResolvedRating>,
) -> Stream {
    match rating {
        Some(rating) => rating_stream(request_id, rating_description(rating), &rating.link_id),
        None => rating_stream(
            request_id,
            format!("{}\n⭐ IMDb Rating: Not Available\n{}", RULE, RULE),
            fallback_link_id,
        ),
    }
}

/// Streams for a Stremio `(type, id)` request
pub async fn streams_for(api: &dyn RatingsApi, media_type: &str, id: &str) -> StreamResponse {
    let stream = match media_type {
        "series" => {
            let Some((series_id, season, episode)) = parse_episode_id(id) else {
                tracing::info!("Invalid series id format: {}", id);
                return StreamResponse::default();
            };
            let rating = resolve_episode(api, series_id, season, episode).await;
            format_stream(id, series_id, rating.as_ref())
        }
        "movie" => {
            let rating = resolve_title(api, id).await;
            format_stream(id, id, rating.as_ref())
        }
        _ => return StreamResponse::default(),
    };

    tracing::info!("Returning rating stream for {} {}", media_type, id);
    StreamResponse { streams: vec![stream] }
}
