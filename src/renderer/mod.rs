//! Rendering engine capability used by the extractor.
//!
//! A [`Renderer`] hands out one [`Session`] (a browser page) per extraction.
//! Sessions are never shared or reused.

pub mod webdriver;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::validation::Viewport;

pub use webdriver::WebDriverRenderer;

/// Failures reported by the rendering engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// No browser session could be created
    #[error("Failed to start browser session: {0}")]
    Session(String),

    /// The browser rejected the viewport size
    #[error("Failed to set viewport: {0}")]
    Viewport(String),

    /// Navigation failed outright (DNS, connection, TLS, ...)
    #[error("{0}")]
    Navigation(String),

    /// The page did not settle within the navigation timeout
    #[error("Navigation timeout of {} ms exceeded", .0.as_millis())]
    Timeout(Duration),

    /// The in-page script threw or returned something unusable
    #[error("Evaluation failed: {0}")]
    Script(String),

    /// Closing the session failed
    #[error("Failed to close browser session: {0}")]
    Release(String),
}

/// Launches browser sessions
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Open a new page with the given viewport
    async fn acquire_session(&self, viewport: Viewport) -> Result<Box<dyn Session>, RenderError>;
}

/// One browser page, used for a single extraction
#[async_trait]
pub trait Session: Send {
    /// Load `url` and wait until the network is idle, within `timeout`
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError>;

    /// Run a script in the page as a function body and return its result
    async fn evaluate(&mut self, script: &str) -> Result<Value, RenderError>;

    /// Close the page
    async fn release(self: Box<Self>) -> Result<(), RenderError>;
}
