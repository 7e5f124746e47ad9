use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::validation::ValidationError;

/// Hostname patterns that point at local or private networks
pub const DEFAULT_BLOCKED_HOST_PATTERNS: [&str; 8] = [
    r"^localhost$",
    r"^127\.",
    r"^192\.168\.",
    r"^10\.",
    r"^172\.(1[6-9]|2[0-9]|3[0-1])\.",
    r"^0\.",
    r"^\[?::1\]?$",
    r"^\[?fe80:",
];

/// Configuration for the target URL filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlFilterConfig {
    /// Schemes a target URL may use
    #[serde(default = "default_allowed_schemes")]
    pub allowed_schemes: Vec<String>,

    /// Regex patterns matched against the lower-cased hostname
    #[serde(default = "default_blocked_host_patterns")]
    pub blocked_host_patterns: Vec<String>,

    /// Maximum length of the raw URL, in characters
    #[serde(default = "default_max_url_length")]
    pub max_url_length: usize,
}

fn default_allowed_schemes() -> Vec<String> {
    vec!["http".to_string(), "https".to_string()]
}

fn default_blocked_host_patterns() -> Vec<String> {
    DEFAULT_BLOCKED_HOST_PATTERNS
        .iter()
        .map(|pattern| pattern.to_string())
        .collect()
}

fn default_max_url_length() -> usize {
    2048
}

impl Default for UrlFilterConfig {
    fn default() -> Self {
        Self {
            allowed_schemes: default_allowed_schemes(),
            blocked_host_patterns: default_blocked_host_patterns(),
            max_url_length: default_max_url_length(),
        }
    }
}

impl UrlFilterConfig {
    /// Default configuration with additional blocked host patterns appended
    pub fn with_extra_blocked_hosts(extra: &[String]) -> Self {
        let mut config = Self::default();
        config.blocked_host_patterns.extend(extra.iter().cloned());
        config
    }
}

/// Guards the renderer against URLs it must never visit
#[derive(Debug)]
pub struct UrlFilter {
    config: UrlFilterConfig,
    blocked_regexes: Vec<Regex>,
}

impl Default for UrlFilter {
    fn default() -> Self {
        Self::new(UrlFilterConfig::default()).expect("Default regex patterns should be valid")
    }
}

impl UrlFilter {
    /// Create a new URL filter from configuration
    pub fn new(config: UrlFilterConfig) -> Result<Self, regex::Error> {
        let mut blocked_regexes = Vec::with_capacity(config.blocked_host_patterns.len());
        for pattern in &config.blocked_host_patterns {
            blocked_regexes.push(Regex::new(pattern)?);
        }

        Ok(Self {
            config,
            blocked_regexes,
        })
    }

    /// Check a raw target URL and return it parsed.
    ///
    /// Checks run in order: syntax, scheme, hostname, length.
    pub fn check(&self, raw: &str) -> Result<Url, ValidationError> {
        let url = Url::parse(raw).map_err(|_| ValidationError::InvalidUrl)?;

        if !self.is_allowed_scheme(&url) {
            return Err(ValidationError::UnsupportedProtocol);
        }

        if self.is_blocked_host(&url) {
            return Err(ValidationError::BlockedHost);
        }

        if crate::utils::js_length(raw) > self.config.max_url_length {
            return Err(ValidationError::UrlTooLong {
                max: self.config.max_url_length,
            });
        }

        Ok(url)
    }

    /// Check if the URL's scheme is allowed
    fn is_allowed_scheme(&self, url: &Url) -> bool {
        self.config
            .allowed_schemes
            .iter()
            .any(|scheme| scheme == url.scheme())
    }

    /// Check if the URL's hostname matches a blocked pattern.
    ///
    /// IPv6 hosts are matched with their brackets, as `Url::host_str` reports them.
    pub fn is_blocked_host(&self, url: &Url) -> bool {
        let hostname = url.host_str().unwrap_or_default().to_lowercase();
        self.blocked_regexes
            .iter()
            .any(|regex| regex.is_match(&hostname))
    }
}
