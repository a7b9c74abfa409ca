use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddonConfig {
    /// Port to bind the add-on server to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether to bind to all interfaces (0.0.0.0) or just localhost
    #[serde(default = "default_bind_all")]
    pub bind_all: bool,

    /// Base URL of the ratings backend
    #[serde(default = "default_ratings_api_url")]
    pub ratings_api_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Enable CORS for cross-origin requests (Stremio clients need it)
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

fn default_port() -> u16 {
    3000
}

fn default_bind_all() -> bool {
    true
}

fn default_ratings_api_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_enable_cors() -> bool {
    true
}

impl Default for AddonConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_all: default_bind_all(),
            ratings_api_url: default_ratings_api_url(),
            request_timeout_secs: default_request_timeout_secs(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            enable_cors: default_enable_cors(),
        }
    }
}

impl AddonConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))
    }

    /// Like [`AddonConfig::load`], but a missing file yields the defaults and `true`.
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<(Self, bool)> {
        let path = path.as_ref();
        if path.exists() {
            Ok((Self::load(path)?, false))
        } else {
            Ok((Self::default(), true))
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        let ip = if self.bind_all {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        } else {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        };
        SocketAddr::new(ip, self.port)
    }
}
