use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use ratings_common::{EpisodeRating, TitleRating};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("ratings backend returned {status} for {url}")]
    Status { url: String, status: StatusCode },

    #[error("ratings backend URL {0} cannot carry a path")]
    InvalidBaseUrl(String),
}

/// Read side of the ratings backend.
///
/// `Ok(None)` means the backend answered but has no rating (404) or rejected
/// the id (400). Transport and decoding problems are errors.
#[async_trait]
pub trait RatingsApi: Send + Sync {
    async fn title_rating(&self, title_id: &str) -> Result<Option<TitleRating>, ClientError>;

    async fn episode_rating(
        &self,
        series_id: &str,
        season: &str,
        episode: &str,
    ) -> Result<Option<EpisodeRating>, ClientError>;
}

/// HTTP client for the ratings backend
#[derive(Clone)]
pub struct RatingsClient {
    client: Client,
    base_url: Url,
}

impl RatingsClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(base_url.to_string()).into());
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ratings-addon/", env!("CARGO_PKG_VERSION")))
            .build()?;

        tracing::info!("Ratings backend at {}", base_url);
        Ok(Self { client, base_url })
    }

    /// Base URL with `segments` appended, each percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_optional<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, ClientError> {
        tracing::debug!("Fetching {}", url);
        let request_err = |source| ClientError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url.clone()).send().await.map_err(request_err)?;
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => Ok(None),
            status if !status.is_success() => Err(ClientError::Status {
                url: url.to_string(),
                status,
            }),
            _ => response.json::<T>().await.map(Some).map_err(request_err),
        }
    }
}

#[async_trait]
impl RatingsApi for RatingsClient {
    async fn title_rating(&self, title_id: &str) -> Result<Option<TitleRating>, ClientError> {
        let url = self.endpoint(&["api", "rating", title_id])?;
        self.get_optional(url).await
    }

    async fn episode_rating(
        &self,
        series_id: &str,
        season: &str,
        episode: &str,
    ) -> Result<Option<EpisodeRating>, ClientError> {
        let url = self.endpoint(&["api", "episode", series_id, season, episode])?;
        self.get_optional(url).await
    }
}
