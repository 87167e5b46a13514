//! Service configuration.
//!
//! Configuration is read from a TOML file (`data/config.toml` by default) at
//! startup. Unlike the feed cache, a missing or invalid configuration is
//! fatal: there is nothing to serve without sources.

pub mod source;

pub use source::{format_interval, parse_interval, EmptyPolicy, Source};

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "data/config.toml";
pub const DEFAULT_MAX_ITEMS: usize = 50;
pub const DEFAULT_MAX_PAGES: usize = 10;

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub listen: String,
    /// Location of the feed snapshot.
    pub cache_path: PathBuf,
    /// Default item cap per feed per refresh.
    pub max_items: usize,
    /// Pages fetched per refresh before pagination is cut off.
    pub max_pages: usize,
    pub empty_policy: EmptyPolicy,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Basic-auth credentials for `/feed` and `/status`; disabled when unset.
    pub username: Option<String>,
    pub password: Option<String>,
    pub sources: Vec<Source>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
            cache_path: PathBuf::from("data/cache.json"),
            max_items: DEFAULT_MAX_ITEMS,
            max_pages: DEFAULT_MAX_PAGES,
            empty_policy: EmptyPolicy::default(),
            request_timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            username: None,
            password: None,
            sources: Vec::new(),
        }
    }
}

/// Limits applied to a single source's refresh, after per-source overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub max_items: usize,
    pub max_pages: usize,
    pub empty_policy: EmptyPolicy,
}

impl Config {
    /// Load and validate configuration from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the refresh pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("no sources configured".into()));
        }
        if self.max_items == 0 {
            return Err(ConfigError::Invalid("max_items must be greater than 0".into()));
        }
        if self.max_pages == 0 {
            return Err(ConfigError::Invalid("max_pages must be greater than 0".into()));
        }

        let mut slugs = HashSet::new();
        for source in &self.sources {
            let invalid = |reason: &str| {
                ConfigError::Invalid(format!("source '{}': {}", source.slug, reason))
            };

            if source.slug.is_empty()
                || !source
                    .slug
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(invalid("slug must be non-empty and use only [A-Za-z0-9_-]"));
            }
            if !slugs.insert(source.slug.as_str()) {
                return Err(invalid("duplicate slug"));
            }
            match Url::parse(&source.url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                _ => return Err(invalid("url must be an absolute http(s) URL")),
            }
            if source.interval == 0 {
                return Err(invalid("interval must be greater than 0"));
            }
            if source.item_selector.is_empty() {
                return Err(invalid("item_selector must not be empty"));
            }
            if source.max_items == Some(0) {
                return Err(invalid("max_items must be greater than 0"));
            }
        }

        Ok(())
    }

    pub fn limits_for(&self, source: &Source) -> FetchLimits {
        FetchLimits {
            max_items: source.max_items.unwrap_or(self.max_items),
            max_pages: self.max_pages,
            empty_policy: source.empty_policy.unwrap_or(self.empty_policy),
        }
    }

    pub fn source(&self, slug: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.slug == slug)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Basic-auth credentials, when a non-empty username is configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match self.username.as_deref() {
            Some(user) if !user.is_empty() => {
                Some((user, self.password.as_deref().unwrap_or("")))
            }
            _ => None,
        }
    }

    /// Write a commented sample configuration to `path` unless one exists.
    ///
    /// Returns `false` when the file was already present.
    pub fn write_sample(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::sample_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(true)
    }

    fn sample_content() -> &'static str {
        r##"# rsslite configuration

# Address the HTTP server listens on
listen = "0.0.0.0:3000"

# Where the feed snapshot is kept between restarts
cache_path = "data/cache.json"

# Default maximum number of items per feed (sources may override)
max_items = 50

# Maximum pages followed per refresh
max_pages = 10

# What to do when a refresh finds no items: "reject" keeps the previous
# items, "accept" publishes an empty feed
empty_policy = "reject"

# Per-request timeout in seconds
request_timeout_secs = 30

# Optional basic auth for /feed and /status
# username = "reader"
# password = "secret"

# HTML source: CSS selectors, next page found with a regex capture group
[[sources]]
name = "Example blog"
slug = "example-blog"
url = "https://example.com/blog/"
interval = "30m"
item_selector = "article"
title_selector = "h2"
link_selector = "a"
description_selector = "p.summary"
next_page_match = 'href="([^"]+)"[^>]*rel="next"'

# JSON source: dotted paths
[[sources]]
name = "Example API"
slug = "example-api"
url = "https://example.com/api/posts"
interval = 3600
max_items = 20
item_selector = "data.posts"
title_selector = "title"
link_selector = "url"
description_selector = "summary"
next_page_match = "data.next"
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
