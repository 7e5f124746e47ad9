use clap::Parser;
use critical_css::config::{ConfigError, ServiceConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "critical-css")]
#[command(about = "HTTP service that extracts the critical CSS of rendered web pages")]
#[command(version)]
pub struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long, env = "CRITICAL_CSS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Address to bind to
    #[arg(long, env = "BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Minimum level of recorded events (debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Directory holding app.log
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Navigation timeout in milliseconds
    #[arg(long, env = "NAVIGATION_TIMEOUT_MS")]
    pub navigation_timeout_ms: Option<u64>,

    /// WebDriver server URL
    #[arg(long, env = "WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// Directory of static files to serve
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Deployment environment reported at startup
    #[arg(long, env = "APP_ENV")]
    pub environment: Option<String>,
}

impl Args {
    /// Load the configuration file (if any) and apply argument overrides
    pub fn into_config(self) -> Result<ServiceConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_file(path)?,
            None => ServiceConfig::default(),
        };

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind_address) = self.bind_address {
            config.bind_address = bind_address;
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }
        if let Some(log_dir) = self.log_dir {
            config.log_dir = log_dir;
        }
        if let Some(timeout) = self.navigation_timeout_ms {
            config.navigation_timeout_ms = timeout;
        }
        if let Some(webdriver_url) = self.webdriver_url.filter(|url| !url.is_empty()) {
            config.webdriver_url = webdriver_url;
        }
        if let Some(static_dir) = self.static_dir {
            config.static_dir = static_dir;
        }
        if let Some(environment) = self.environment {
            config.environment = environment;
        }

        Ok(config)
    }
}
