use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::module::imdb::DatasetDescriptor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Where compressed downloads are staged while a refresh runs
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_ratings_url")]
    pub ratings_url: String,

    #[serde(default = "default_episodes_url")]
    pub episodes_url: String,

    /// UTC hour of the daily refresh
    #[serde(default = "default_refresh_hour")]
    pub refresh_hour: u32,

    #[serde(default)]
    pub refresh_minute: u32,

    /// Refresh immediately at startup when the cache is empty
    #[serde(default = "default_refresh_on_startup")]
    pub refresh_on_startup: bool,

    /// Whole-request timeout for one dataset download
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_ratings_url() -> String {
    "https://datasets.imdbws.com/title.ratings.tsv.gz".to_string()
}

fn default_episodes_url() -> String {
    "https://datasets.imdbws.com/title.episode.tsv.gz".to_string()
}

fn default_refresh_hour() -> u32 {
    2
}

fn default_refresh_on_startup() -> bool {
    true
}

fn default_http_timeout_secs() -> u64 {
    30 * 60
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            data_dir: default_data_dir(),
            ratings_url: default_ratings_url(),
            episodes_url: default_episodes_url(),
            refresh_hour: default_refresh_hour(),
            refresh_minute: 0,
            refresh_on_startup: default_refresh_on_startup(),
            http_timeout_secs: default_http_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl BackendConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    ///
    /// Logging is not initialised yet when this runs, so the returned flag
    /// tells the caller whether the defaults were used.
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<(Self, bool)> {
        let path = path.as_ref();
        if path.exists() {
            Ok((Self::from_file(path)?, false))
        } else {
            Ok((Self::default(), true))
        }
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: BackendConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.refresh_hour > 23 {
            anyhow::bail!("refresh_hour must be in 0..=23, got {}", self.refresh_hour);
        }
        if self.refresh_minute > 59 {
            anyhow::bail!("refresh_minute must be in 0..=59, got {}", self.refresh_minute);
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn ratings_dataset(&self) -> DatasetDescriptor {
        DatasetDescriptor::new("title.ratings.tsv", &self.ratings_url)
    }

    pub fn episodes_dataset(&self) -> DatasetDescriptor {
        DatasetDescriptor::new("title.episode.tsv", &self.episodes_url)
    }
}
