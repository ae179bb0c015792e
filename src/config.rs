use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::feed::DEFAULT_MAX_ITEMS_PER_FEED;
use crate::models::FeedSource;

const APP_DIR: &str = "news-relay";
const BUILTIN_FEEDS: &str = include_str!("../feeds.toml");

pub const ENV_API_URL: &str = "NEWS_API_URL";
pub const ENV_API_KEY: &str = "NEWS_API_KEY";
pub const ENV_INGEST_API_KEY: &str = "NEWS_INGEST_API_KEY";

/// Settings for the `news-pull` batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    pub api_key: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_items_per_feed")]
    pub max_items_per_feed: usize,

    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    #[serde(default = "default_delivery_delay")]
    pub delivery_delay_ms: u64,

    #[serde(default = "default_cache_path")]
    pub cache_path: String,

    /// Flush the delivery cache after every successful post instead of once per run.
    #[serde(default)]
    pub persist_each_delivery: bool,

    /// Feed catalog file; the built-in catalog is used when unset.
    pub feeds_path: Option<String>,
}

fn default_api_url() -> String {
    "http://localhost:8000/api/news".to_string()
}

fn default_request_timeout() -> u64 {
    20
}

fn default_max_items_per_feed() -> usize {
    DEFAULT_MAX_ITEMS_PER_FEED
}

fn default_fetch_concurrency() -> usize {
    5
}

fn default_delivery_delay() -> u64 {
    200
}

fn default_cache_path() -> String {
    "./posted_links.json".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout(),
            max_items_per_feed: default_max_items_per_feed(),
            fetch_concurrency: default_fetch_concurrency(),
            delivery_delay_ms: default_delivery_delay(),
            cache_path: default_cache_path(),
            persist_each_delivery: false,
            feeds_path: None,
        }
    }
}

impl ClientConfig {
    /// Load from an explicit path, or from the per-user config file
    /// (written with defaults if it does not exist yet).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config: ClientConfig = match path {
            Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
            None => {
                let config_path = config_dir().join("client.toml");
                if config_path.exists() {
                    toml::from_str(&std::fs::read_to_string(&config_path)?)?
                } else {
                    let config = ClientConfig::default();
                    write_toml(&config_path, &config)?;
                    config
                }
            }
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            self.api_url = url;
        }
        if let Ok(key) = std::env::var(ENV_API_KEY) {
            self.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api_url)
            .map_err(|e| AppError::Config(format!("api_url '{}': {}", self.api_url, e)))?;
        if self.fetch_concurrency == 0 {
            return Err(AppError::Config("fetch_concurrency must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config("request_timeout_secs must be at least 1".into()));
        }
        Ok(())
    }

    pub fn catalog(&self) -> Result<FeedCatalog> {
        match &self.feeds_path {
            Some(path) => FeedCatalog::load(Path::new(path)),
            None => FeedCatalog::builtin(),
        }
    }
}

/// Settings for the `news-server` ingest API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Expected `X-API-Key` value for write endpoints.
    pub api_key: Option<String>,

    /// Whether write endpoints check the key. Defaults to whether a key is configured.
    pub require_api_key: Option<bool>,

    /// Catalog used to seed the category and agency tables on startup.
    pub feeds_path: Option<String>,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("news.db").to_string_lossy().to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            db_path: default_db_path(),
            api_key: None,
            require_api_key: None,
            feeds_path: None,
        }
    }
}

impl ServerConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config: ServerConfig = match path {
            Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
            None => {
                let config_path = config_dir().join("server.toml");
                if config_path.exists() {
                    toml::from_str(&std::fs::read_to_string(&config_path)?)?
                } else {
                    ServerConfig::default()
                }
            }
        };
        if let Ok(key) = std::env::var(ENV_INGEST_API_KEY) {
            if !key.is_empty() {
                config.api_key = Some(key);
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn requires_api_key(&self) -> bool {
        self.require_api_key.unwrap_or(self.api_key.is_some())
    }

    pub fn validate(&self) -> Result<()> {
        if self.requires_api_key() && self.api_key.as_deref().unwrap_or("").is_empty() {
            return Err(AppError::Config(
                "require_api_key is set but no api_key is configured".into(),
            ));
        }
        Ok(())
    }
}

/// Ordered list of categories, each with the feeds that publish into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedCatalog {
    pub categories: Vec<CatalogCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogCategory {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub feeds: Vec<CatalogFeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFeed {
    pub url: String,
    pub agency: String,
    pub agency_id: i64,
}

impl FeedCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_FEEDS)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Flatten into feed sources, preserving catalog order.
    pub fn sources(&self) -> Vec<FeedSource> {
        self.categories
            .iter()
            .flat_map(|cat| {
                cat.feeds.iter().map(move |feed| FeedSource {
                    category_id: cat.id,
                    agency_id: feed.agency_id,
                    url: feed.url.clone(),
                    category: cat.name.clone(),
                    agency: feed.agency.clone(),
                })
            })
            .collect()
    }

    /// Distinct agencies as `(id, name)`, first occurrence wins.
    pub fn agencies(&self) -> Vec<(i64, String)> {
        let mut seen = std::collections::HashSet::new();
        self.categories
            .iter()
            .flat_map(|cat| cat.feeds.iter())
            .filter(|feed| seen.insert(feed.agency_id))
            .map(|feed| (feed.agency_id, feed.agency.clone()))
            .collect()
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn write_toml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(value).map_err(|e| AppError::Config(e.to_string()))?;
    std::fs::write(path, content)?;
    Ok(())
}
