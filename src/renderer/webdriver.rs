use async_trait::async_trait;
use fantoccini::wd::{Capabilities, TimeoutConfiguration};
use fantoccini::{Client, ClientBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::time::{Instant, timeout};

use super::{RenderError, Renderer, Session};
use crate::validation::Viewport;

/// Interval between two network activity samples
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Consecutive unchanged samples needed to call the network idle
const IDLE_POLLS_REQUIRED: u32 = 2;

/// Longest time spent waiting for quiescence once the page has loaded
const MAX_IDLE_WAIT: Duration = Duration::from_secs(10);

const NETWORK_SAMPLE_SCRIPT: &str = "return { \
    readyState: document.readyState, \
    resourceCount: performance.getEntriesByType('resource').length \
};";

const VIEWPORT_SCRIPT: &str = "return [window.innerWidth, window.innerHeight];";

/// Renderer backed by a WebDriver server (chromedriver, geckodriver, ...)
#[derive(Debug, Clone)]
pub struct WebDriverRenderer {
    webdriver_url: String,
}

impl WebDriverRenderer {
    /// Create a renderer that opens sessions on the given WebDriver server
    pub fn new(webdriver_url: &str) -> Self {
        Self {
            webdriver_url: webdriver_url.to_string(),
        }
    }
}

/// Capabilities for a headless browser sized to the viewport
pub fn browser_capabilities(viewport: Viewport) -> Capabilities {
    let window_size = format!("--window-size={},{}", viewport.width, viewport.height);

    let mut caps = Capabilities::new();
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({
            "args": [
                "--headless=new",
                "--no-sandbox",
                "--disable-setuid-sandbox",
                "--disable-dev-shm-usage",
                "--disable-gpu",
                window_size,
            ]
        }),
    );
    caps.insert(
        "moz:firefoxOptions".to_string(),
        json!({ "args": ["-headless"] }),
    );
    caps
}

#[async_trait]
impl Renderer for WebDriverRenderer {
    async fn acquire_session(&self, viewport: Viewport) -> Result<Box<dyn Session>, RenderError> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(browser_capabilities(viewport));

        let client = builder
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| RenderError::Session(e.to_string()))?;
        ::log::debug!("Connected to WebDriver at {}", self.webdriver_url);

        let fitted = fit_viewport(&client, viewport).await;
        if let Err(e) = fitted {
            // The session exists already, so it must not leak
            if let Err(close_error) = client.close().await {
                ::log::warn!("Failed to close WebDriver session: {}", close_error);
            }
            return Err(e);
        }

        Ok(Box::new(WebDriverSession { client }))
    }
}

/// Size the window so that its content area matches the viewport.
///
/// WebDriver resizes the outer window, so browser chrome is measured and
/// added back in a second resize when needed.
async fn fit_viewport(client: &Client, viewport: Viewport) -> Result<(), RenderError> {
    let window = (viewport.width, viewport.height);
    client
        .set_window_size(window.0, window.1)
        .await
        .map_err(|e| RenderError::Viewport(e.to_string()))?;

    let raw = client
        .execute(VIEWPORT_SCRIPT, Vec::new())
        .await
        .map_err(|e| RenderError::Viewport(e.to_string()))?;
    let inner: (u32, u32) =
        serde_json::from_value(raw).map_err(|e| RenderError::Viewport(e.to_string()))?;

    if let Some((width, height)) = corrected_window_size(viewport, window, inner) {
        ::log::debug!(
            "Content area is {}x{}, resizing window to {}x{}",
            inner.0,
            inner.1,
            width,
            height
        );
        client
            .set_window_size(width, height)
            .await
            .map_err(|e| RenderError::Viewport(e.to_string()))?;
    }

    Ok(())
}

/// Outer window size giving the requested content area, or `None` when the
/// measured content area already matches
fn corrected_window_size(
    requested: Viewport,
    window: (u32, u32),
    inner: (u32, u32),
) -> Option<(u32, u32)> {
    if inner == (requested.width, requested.height) {
        return None;
    }

    let adjust = |target: u32, outer: u32, measured: u32| {
        target.saturating_add(outer).saturating_sub(measured)
    };
    Some((
        adjust(requested.width, window.0, inner.0),
        adjust(requested.height, window.1, inner.1),
    ))
}

/// Session timeouts that make the browser itself give up on a page load
/// after `limit`
fn navigation_timeouts(limit: Duration) -> TimeoutConfiguration {
    TimeoutConfiguration::new(Some(limit), Some(limit), Some(Duration::ZERO))
}

/// One WebDriver browsing session
pub struct WebDriverSession {
    client: Client,
}

impl WebDriverSession {
    /// Poll the page until network activity settles or the idle wait runs out
    async fn wait_for_network_idle(&self) -> Result<(), RenderError> {
        let deadline = Instant::now() + MAX_IDLE_WAIT;
        let mut tracker = IdleTracker::default();

        loop {
            let raw = self
                .client
                .execute(NETWORK_SAMPLE_SCRIPT, Vec::new())
                .await
                .map_err(|e| RenderError::Navigation(e.to_string()))?;
            let sample: NetworkSample =
                serde_json::from_value(raw).map_err(|e| RenderError::Script(e.to_string()))?;

            if tracker.observe(&sample) {
                ::log::trace!("Network idle after {} resources", sample.resource_count);
                return Ok(());
            }

            if Instant::now() >= deadline {
                ::log::debug!("Network still busy after {:?}, continuing", MAX_IDLE_WAIT);
                return Ok(());
            }

            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl Session for WebDriverSession {
    async fn navigate(&mut self, url: &str, limit: Duration) -> Result<(), RenderError> {
        // A dropped `goto` keeps running in the browser, so the browser must
        // abort the load itself or `release` would wait for it
        self.client
            .update_timeouts(navigation_timeouts(limit))
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        let start = Instant::now();
        let load = async {
            self.client.goto(url).await.map_err(|e| {
                if start.elapsed() >= limit {
                    RenderError::Timeout(limit)
                } else {
                    RenderError::Navigation(e.to_string())
                }
            })?;
            self.wait_for_network_idle().await
        };

        match timeout(limit, load).await {
            Ok(result) => result,
            Err(_) => Err(RenderError::Timeout(limit)),
        }
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value, RenderError> {
        self.client
            .execute(script, Vec::new())
            .await
            .map_err(|e| RenderError::Script(e.to_string()))
    }

    async fn release(self: Box<Self>) -> Result<(), RenderError> {
        self.client
            .close()
            .await
            .map_err(|e| RenderError::Release(e.to_string()))
    }
}

/// Page load state and number of finished resource fetches
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkSample {
    ready_state: String,
    resource_count: u64,
}

/// Decides when a sequence of samples shows a quiet network
#[derive(Debug, Default)]
struct IdleTracker {
    previous_count: Option<u64>,
    quiet_polls: u32,
}

impl IdleTracker {
    /// Feed a sample; returns true once the network is idle
    fn observe(&mut self, sample: &NetworkSample) -> bool {
        let quiet =
            sample.ready_state == "complete" && self.previous_count == Some(sample.resource_count);

        self.quiet_polls = if quiet { self.quiet_polls + 1 } else { 0 };
        self.previous_count = Some(sample.resource_count);

        self.quiet_polls >= IDLE_POLLS_REQUIRED
    }
}
