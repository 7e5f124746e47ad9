use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::logging::{Level, ParseLevelError};

/// Errors raised while loading the service configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Level(#[from] ParseLevelError),

    #[error("invalid blocked host pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Configuration for the extraction service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Port the HTTP server listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Minimum level of recorded events (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory holding `app.log`
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Upper bound for navigating to a page and waiting for it to settle
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Directory of static files served next to the API
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Deployment environment reported at startup
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Hostname regexes blocked in addition to the built-in private ranges
    #[serde(default)]
    pub extra_blocked_hosts: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            webdriver_url: default_webdriver_url(),
            static_dir: default_static_dir(),
            environment: default_environment(),
            extra_blocked_hosts: Vec::new(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Parsed event log level
    pub fn level(&self) -> Result<Level, ConfigError> {
        Ok(self.log_level.parse::<Level>()?)
    }

    /// Navigation timeout as a duration
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

/// Default value for port
fn default_port() -> u16 {
    3000
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

/// One minute, long enough for heavy pages on slow networks
fn default_navigation_timeout_ms() -> u64 {
    60_000
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_environment() -> String {
    "development".to_string()
}
