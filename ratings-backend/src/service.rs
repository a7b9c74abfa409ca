//! HTTP query service
//!
//! Thin JSON surface over [`LookupEngine`] and the cache/refresh status.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use ratings_common::{EpisodeRating, ErrorBody, RatingKind, TitleRating};

use crate::module::imdb::{CacheStatus, LookupEngine, LookupError, RatingsUpdater, RefreshStatus};

const SERVICE_NAME: &str = "IMDb Ratings API";

#[derive(Clone)]
pub struct AppState {
    lookup: LookupEngine,
    updater: Arc<RatingsUpdater>,
}

impl AppState {
    pub fn new(lookup: LookupEngine, updater: Arc<RatingsUpdater>) -> Self {
        Self { lookup, updater }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(status))
        .route("/status", get(status))
        .route("/api/rating/{title_id}", get(title_rating))
        .route("/api/episode/{series_id}/{season}/{episode}", get(episode_rating))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error response: 400 for malformed ids, 404 for misses
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn from_lookup(err: &LookupError) -> Self {
        let mut body = ErrorBody::new(err.to_string());
        body.reason = err.not_found_reason();

        let status = match err {
            LookupError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::NOT_FOUND,
        };
        Self { status, body }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

async fn title_rating(
    State(state): State<AppState>,
    Path(title_id): Path<String>,
) -> Result<Json<TitleRating>, ApiError> {
    match state.lookup.lookup_title(&title_id).await {
        Ok(record) => Ok(Json(TitleRating {
            title_id: record.title_id,
            rating: record.rating,
            vote_count: record.vote_count,
            kind: RatingKind::Direct,
        })),
        Err(err) => {
            tracing::debug!("Title lookup for {} failed: {}", title_id, err);
            let mut api_err = ApiError::from_lookup(&err);
            if let LookupError::TitleNotRated { title_id } = err {
                api_err.body.title_id = Some(title_id);
            }
            Err(api_err)
        }
    }
}

async fn episode_rating(
    State(state): State<AppState>,
    Path((series_id, season, episode)): Path<(String, String, String)>,
) -> Result<Json<EpisodeRating>, ApiError> {
    match state.lookup.lookup_episode(&series_id, &season, &episode).await {
        Ok(found) => Ok(Json(EpisodeRating {
            series_id,
            season,
            episode,
            episode_id: found.episode_id,
            rating: found.record.rating,
            vote_count: found.record.vote_count,
            kind: RatingKind::Episode,
        })),
        Err(err) => {
            tracing::debug!(
                "Episode lookup for {}:{}:{} failed: {}",
                series_id,
                season,
                episode,
                err
            );
            let mut api_err = ApiError::from_lookup(&err);
            match err {
                LookupError::InvalidArgument { .. } => {}
                LookupError::EpisodeNotRated { episode_id } => {
                    api_err.body.episode_id = Some(episode_id);
                    api_err.body.series_id = Some(series_id);
                    api_err.body.season = Some(season);
                    api_err.body.episode = Some(episode);
                }
                _ => {
                    api_err.body.series_id = Some(series_id);
                    api_err.body.season = Some(season);
                    api_err.body.episode = Some(episode);
                }
            }
            Err(api_err)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody {
    status: &'static str,
    #[serde(flatten)]
    cache: CacheStatus,
    refresh: RefreshStatus,
}

async fn status(State(state): State<AppState>) -> Json<StatusBody> {
    let cache = state.updater.store().status().await;
    Json(StatusBody {
        status: if cache.data_loaded { "healthy" } else { "loading" },
        cache,
        refresh: state.updater.status(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexBody {
    service: &'static str,
    version: &'static str,
    status: &'static str,
    last_updated: Option<DateTime<Utc>>,
    data: IndexCounts,
    endpoints: serde_json::Value,
    examples: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct IndexCounts {
    ratings: usize,
    episodes: usize,
}

async fn index(State(state): State<AppState>) -> Json<IndexBody> {
    let cache = state.updater.store().status().await;
    Json(IndexBody {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        status: "active",
        last_updated: cache.last_updated,
        data: IndexCounts {
            ratings: cache.ratings_count,
            episodes: cache.episodes_count,
        },
        endpoints: serde_json::json!({
            "titleRating": "/api/rating/{titleId}",
            "episodeRating": "/api/episode/{seriesId}/{season}/{episode}",
            "status": "/status",
            "health": "/health",
        }),
        examples: serde_json::json!({
            "movie": "/api/rating/tt0111161",
            "episode": "/api/episode/tt0903747/1/1",
        }),
    })
}
