//! Meta tag extraction service
//!
//! Renders batches of URLs in a shared headless Chromium and returns title,
//! description, canonical link, first H1 and Open Graph properties for each.

pub mod app;
pub mod browser;
pub mod browser_setup;
pub mod cache;
pub mod coordinator;
pub mod http;
mod manager;
pub mod normalizer;
pub mod page_extractor;
pub mod scheduler;
pub mod utils;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::browser_setup::LaunchProfile;
use crate::utils::ConfigError;
use crate::utils::constants::{
    ACCEPT_LANGUAGE, CHROME_USER_AGENT, DEFAULT_BODY_LIMIT_BYTES, DEFAULT_CACHE_MAX_ENTRIES,
    DEFAULT_CACHE_TTL, DEFAULT_CONCURRENCY, DEFAULT_NAVIGATION_TIMEOUT_MS,
    DEFAULT_RATE_LIMIT_REQUESTS, DEFAULT_RATE_LIMIT_WINDOW_SECS,
};

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "METATAG_SCRAPER_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    /// How long shutdown waits for in-flight extractions before closing the browser.
    /// Zero closes the browser immediately.
    #[serde(default)]
    pub shutdown_grace_secs: u64,
}

/// HTTP listener and boundary policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the front-end; `index.html` is the SPA fallback
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Allowed CORS origins. `"*"` allows any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Per-IP rate limit for `/api/*`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_rate_limit_requests")]
    pub requests: u32,

    #[serde(default = "default_rate_limit_window_secs")]
    pub window_secs: u64,
}

/// Extraction pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Maximum simultaneous page extractions
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// Sub-resource kinds aborted during page loads
    #[serde(default = "default_blocked_resources")]
    pub blocked_resources: Vec<ResourceKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

/// Browser launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Sandbox profile; `auto` picks `restricted` inside containers
    #[serde(default)]
    pub profile: LaunchProfile,

    /// Explicit Chrome/Chromium binary. Skips discovery when set.
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Window dimensions
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,
}

fn default_true() -> bool {
    true
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}
fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}
fn default_body_limit_bytes() -> usize {
    DEFAULT_BODY_LIMIT_BYTES
}
fn default_rate_limit_requests() -> u32 {
    DEFAULT_RATE_LIMIT_REQUESTS
}
fn default_rate_limit_window_secs() -> u64 {
    DEFAULT_RATE_LIMIT_WINDOW_SECS
}
fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}
fn default_navigation_timeout_ms() -> u64 {
    DEFAULT_NAVIGATION_TIMEOUT_MS
}
fn default_user_agent() -> String {
    CHROME_USER_AGENT.to_string()
}
fn default_accept_language() -> String {
    ACCEPT_LANGUAGE.to_string()
}
fn default_blocked_resources() -> Vec<ResourceKind> {
    ResourceKind::ALL.to_vec()
}
fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL.as_secs()
}
fn default_cache_max_entries() -> usize {
    DEFAULT_CACHE_MAX_ENTRIES
}
fn default_sweep_interval_secs() -> u64 {
    60
}
fn default_headless() -> bool {
    true
}
fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            cors_origins: default_cors_origins(),
            body_limit_bytes: default_body_limit_bytes(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: default_rate_limit_requests(),
            window_secs: default_rate_limit_window_secs(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            blocked_resources: default_blocked_resources(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            max_entries: default_cache_max_entries(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            profile: LaunchProfile::default(),
            executable: None,
            window: WindowConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

impl ScrapeConfig {
    pub fn navigation_timeout(&self) -> Result<Duration, ConfigError> {
        utils::validate_navigation_timeout(Some(self.navigation_timeout_ms), DEFAULT_NAVIGATION_TIMEOUT_MS)
    }

    pub fn page_policy(&self) -> PagePolicy {
        PagePolicy {
            blocked: self.blocked_resources.clone(),
            user_agent: self.user_agent.clone(),
            accept_language: self.accept_language.clone(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Config {
    /// Parse a YAML config file; missing fields take their defaults
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply `PORT` from the environment, as hosting platforms set it
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                field: "PORT",
                reason: format!("not a valid port number: {port:?}"),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scrape.concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "scrape.concurrency",
                reason: "at least one concurrent extraction is required".to_string(),
            });
        }
        self.scrape.navigation_timeout()?;

        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "cache.ttl_secs",
                reason: "ttl must be greater than zero".to_string(),
            });
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "cache.sweep_interval_secs",
                reason: "sweep interval must be greater than zero".to_string(),
            });
        }

        let rate_limit = &self.server.rate_limit;
        if rate_limit.enabled && (rate_limit.requests == 0 || rate_limit.window_secs == 0) {
            return Err(ConfigError::Invalid {
                field: "server.rate_limit",
                reason: "requests and window_secs must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Load config from `$METATAG_SCRAPER_CONFIG`, else `./config.yaml`, else defaults
pub fn load_yaml_config() -> Result<Config, ConfigError> {
    let explicit = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    let config_path = explicit.clone().unwrap_or_else(|| PathBuf::from("config.yaml"));

    let mut config = if config_path.exists() {
        Config::from_yaml_file(&config_path)?
    } else if explicit.is_some() {
        return Err(ConfigError::Read {
            path: config_path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
        });
    } else {
        Config::default()
    };

    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

pub use app::App;
pub use browser::{
    BrowserError, BrowserResult, BrowserWrapper, ChromiumPage, Navigation, PagePolicy,
    RenderPage, RenderSession, ResourceKind, download_managed_browser,
    find_browser_executable, launch_browser,
};
pub use cache::ResultCache;
pub use coordinator::{BatchCoordinator, CoordinatorError};
pub use manager::BrowserSession;
pub use normalizer::{NormalizedUrl, normalize_urls};
pub use page_extractor::{ExtractionResult, MetaTag, PageExtractor};
pub use scheduler::{QueueError, TaskHandle, TaskQueue};
