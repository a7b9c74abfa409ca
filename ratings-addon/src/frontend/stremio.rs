//! Stremio add-on protocol endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use ratings_common::TITLE_ID_PREFIX;

use crate::backend::RatingsApi;
use crate::stream::{streams_for, StreamResponse};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: &'static str,
    pub version: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub resources: Vec<&'static str>,
    pub types: Vec<&'static str>,
    pub catalogs: Vec<serde_json::Value>,
    pub id_prefixes: Vec<&'static str>,
}

impl Manifest {
    pub fn new() -> Self {
        Self {
            id: "imdb.ratings.local",
            version: "2.0.0",
            name: "IMDb Ratings (Local Dataset)",
            description: "Shows IMDb ratings for movies and TV episodes using local IMDb dataset",
            resources: vec!["stream"],
            types: vec!["movie", "series"],
            catalogs: Vec::new(),
            id_prefixes: vec![TITLE_ID_PREFIX],
        }
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct AddonState {
    api: Arc<dyn RatingsApi>,
}

impl AddonState {
    pub fn new(api: Arc<dyn RatingsApi>) -> Self {
        Self { api }
    }
}

pub fn router(state: AddonState, enable_cors: bool) -> Router {
    let app = Router::new()
        .route("/manifest.json", get(manifest))
        .route("/stream/{media_type}/{file}", get(stream))
        .route("/health", get(|| async { "OK" }))
        .with_state(state);

    let app = if enable_cors {
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        app
    };

    app.layer(TraceLayer::new_for_http())
}

async fn manifest() -> Json<Manifest> {
    Json(Manifest::new())
}

async fn stream(
    State(state): State<AddonState>,
    Path((media_type, file)): Path<(String, String)>,
) -> Json<StreamResponse> {
    let id = file.strip_suffix(".json").unwrap_or(&file);
    tracing::info!("Stream request: {} {}", media_type, id);
    Json(streams_for(state.api.as_ref(), &media_type, id).await)
}
