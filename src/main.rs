use clap::Parser;
use critical_css::config::ServiceConfig;
use critical_css::extractor::Extractor;
use critical_css::filter::{UrlFilter, UrlFilterConfig};
use critical_css::logging::EventLog;
use critical_css::renderer::WebDriverRenderer;
use critical_css::server::{self, AppState};
use critical_css::validation::RequestValidator;
use std::error::Error;
use std::sync::Arc;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Args::parse().into_config()?;
    let level = config.level()?;

    // Console logging follows the event log's threshold unless RUST_LOG says otherwise
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str()))
        .init();

    let log = Arc::new(EventLog::open(&config.log_dir, level)?);
    let state = build_state(&config, log)?;

    ::log::info!(
        "Using WebDriver at {} (navigation timeout {} ms)",
        config.webdriver_url,
        config.navigation_timeout_ms
    );
    println!("Note: extraction requires a WebDriver server (e.g., ChromeDriver).");

    server::serve(&config, state).await?;
    Ok(())
}

/// Wire the renderer, extractor and validator from configuration
fn build_state(config: &ServiceConfig, log: Arc<EventLog>) -> Result<AppState, Box<dyn Error>> {
    let renderer = Arc::new(WebDriverRenderer::new(&config.webdriver_url));
    let extractor =
        Extractor::new(renderer, log.clone()).with_navigation_timeout(config.navigation_timeout());

    let filter_config = UrlFilterConfig::with_extra_blocked_hosts(&config.extra_blocked_hosts);
    let validator = RequestValidator::new(UrlFilter::new(filter_config)?);

    Ok(AppState::new(extractor, validator, log))
}
