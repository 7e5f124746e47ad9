use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::extract::{PageSnapshot, SNAPSHOT_SCRIPT, extract_critical_css};
use crate::logging::EventLog;
use crate::renderer::{RenderError, Renderer, Session};
use crate::results::ExtractionResult;
use crate::utils::format_duration;
use crate::validation::Viewport;

/// Default upper bound for navigation, in milliseconds
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 60_000;

/// Why an extraction failed; the message is returned to the client
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Unexpected page snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Runs critical CSS extractions, one browser session per call
pub struct Extractor {
    renderer: Arc<dyn Renderer>,
    navigation_timeout: Duration,
    log: Arc<EventLog>,
}

impl Extractor {
    /// Create a new extractor with the default navigation timeout
    pub fn new(renderer: Arc<dyn Renderer>, log: Arc<EventLog>) -> Self {
        Self {
            renderer,
            navigation_timeout: Duration::from_millis(DEFAULT_NAVIGATION_TIMEOUT_MS),
            log,
        }
    }

    /// Set the navigation timeout
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Render `url` at the given viewport and extract its critical CSS.
    ///
    /// The session is released whatever the outcome; a failed release is
    /// logged and never replaces the extraction's own result.
    pub async fn extract(
        &self,
        url: &str,
        viewport: Viewport,
    ) -> Result<ExtractionResult, ExtractError> {
        let start = Instant::now();
        self.log.info(
            "Starting critical CSS extraction",
            json!({ "url": url, "width": viewport.width, "height": viewport.height }),
        );

        let outcome = match self.renderer.acquire_session(viewport).await {
            Ok(mut session) => {
                let outcome = self.run(session.as_mut(), url).await;
                if let Err(e) = session.release().await {
                    self.log.error(
                        "Failed to release rendering session",
                        json!({ "url": url, "error": e.to_string() }),
                    );
                }
                outcome
            }
            Err(e) => Err(e.into()),
        };

        let duration = format_duration(start.elapsed());
        match &outcome {
            Ok(result) => self.log.info(
                "Extraction succeeded",
                json!({
                    "url": url,
                    "cssSize": result.css_size(),
                    "originalSize": result.original_size,
                    "rulesCount": result.rules_count,
                    "usedSelectorsCount": result.used_selectors_count,
                    "reduction": format!("{:.2}%", result.reduction_percent()),
                    "duration": duration,
                }),
            ),
            Err(e) => self.log.error(
                "Extraction failed",
                json!({ "url": url, "error": e.to_string(), "duration": duration }),
            ),
        }

        outcome
    }

    /// Navigate, snapshot the page and run the extraction on the snapshot
    async fn run(
        &self,
        session: &mut dyn Session,
        url: &str,
    ) -> Result<ExtractionResult, ExtractError> {
        self.log.debug("Navigating to URL", json!({ "url": url }));
        session.navigate(url, self.navigation_timeout).await?;

        let raw = session.evaluate(SNAPSHOT_SCRIPT).await?;
        let snapshot: PageSnapshot = serde_json::from_value(raw)?;

        Ok(extract_critical_css(&snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Level;
    use crate::renderer::fake::FakeRenderer;
    use serde_json::Value;
    use std::sync::atomic::Ordering;

    fn page() -> Value {
        json!({
            "elements": [
                {"tagName": "DIV", "id": "x", "className": "a b", "display": "block", "visibility": "visible"}
            ],
            "styleSheets": [
                {"href": "https://cdn.example.com/x.css", "error": "SecurityError: cssRules"},
                {"href": null, "rules": [
                    {"kind": "style", "selectorText": "#x", "cssText": "#x{color:red}"},
                    {"kind": "style", "selectorText": ".a", "cssText": ".a{margin:0}"},
                    {"kind": "style", "selectorText": ".c", "cssText": ".c{padding:0}"},
                    {"kind": "style", "selectorText": "span", "cssText": "span{display:none}"}
                ]}
            ]
        })
    }

    fn extractor(renderer: FakeRenderer) -> Extractor {
        Extractor::new(
            Arc::new(renderer),
            Arc::new(EventLog::console_only(Level::Debug)),
        )
        .with_navigation_timeout(Duration::from_secs(5))
    }

    const VIEWPORT: Viewport = Viewport {
        width: 1280,
        height: 800,
    };

    #[tokio::test]
    async fn test_successful_extraction() {
        let renderer = FakeRenderer::with_page(page());
        let calls = renderer.calls.clone();

        let result = extractor(renderer)
            .extract("https://example.com/", VIEWPORT)
            .await
            .unwrap();

        assert_eq!(result.css, "#x{color:red}\n.a{margin:0}\n");
        assert_eq!(result.rules_count, 2);
        assert_eq!(result.used_selectors_count, 4);
        assert_eq!(result.original_size, 13 + 12 + 13 + 18);

        assert_eq!(calls.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(calls.released.load(Ordering::SeqCst), 1);
        assert_eq!(*calls.viewports.lock().unwrap(), vec![VIEWPORT]);
        assert_eq!(
            *calls.navigations.lock().unwrap(),
            vec![("https://example.com/".to_string(), Duration::from_secs(5))]
        );
    }

    #[tokio::test]
    async fn test_navigation_failure_still_releases() {
        let mut renderer = FakeRenderer::with_page(page());
        renderer.navigation_error = Some(RenderError::Timeout(Duration::from_secs(5)));
        let calls = renderer.calls.clone();

        let err = extractor(renderer)
            .extract("https://slow.example.com/", VIEWPORT)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Navigation timeout of 5000 ms exceeded");
        assert_eq!(calls.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_failure_does_not_mask_result() {
        let mut renderer = FakeRenderer::with_page(page());
        renderer.release_error = Some(RenderError::Release("session gone".to_string()));

        let result = extractor(renderer)
            .extract("https://example.com/", VIEWPORT)
            .await;
        assert!(result.is_ok());

        let mut renderer = FakeRenderer::with_page(page());
        renderer.navigation_error = Some(RenderError::Navigation(
            "net::ERR_NAME_NOT_RESOLVED".to_string(),
        ));
        renderer.release_error = Some(RenderError::Release("session gone".to_string()));

        let err = extractor(renderer)
            .extract("https://nowhere.invalid/", VIEWPORT)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "net::ERR_NAME_NOT_RESOLVED");
    }

    #[tokio::test]
    async fn test_session_failure() {
        let mut renderer = FakeRenderer::default();
        renderer.acquire_error = Some(RenderError::Session("connection refused".to_string()));
        let calls = renderer.calls.clone();

        let err = extractor(renderer)
            .extract("https://example.com/", VIEWPORT)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("connection refused"));
        assert_eq!(calls.released.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_snapshot() {
        let renderer = FakeRenderer::with_page(json!("not a snapshot"));
        let calls = renderer.calls.clone();

        let err = extractor(renderer)
            .extract("https://example.com/", VIEWPORT)
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractError::Snapshot(_)));
        assert_eq!(calls.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_default_timeout() {
        let renderer = FakeRenderer::with_page(page());
        let calls = renderer.calls.clone();
        let extractor = Extractor::new(
            Arc::new(renderer),
            Arc::new(EventLog::console_only(Level::Info)),
        );

        extractor.extract("https://example.com/", VIEWPORT).await.unwrap();
        assert_eq!(
            calls.navigations.lock().unwrap()[0].1,
            Duration::from_secs(60)
        );
    }

    fn file_log(name: &str) -> Arc<EventLog> {
        let dir = std::env::temp_dir().join(format!(
            "critical-css-extractor-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        Arc::new(EventLog::open(&dir, Level::Debug).unwrap())
    }

    fn read_records(log: &EventLog) -> Vec<Value> {
        let contents = std::fs::read_to_string(log.path().unwrap()).unwrap();
        contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_outcomes_are_logged() {
        let log = file_log("success");
        let extractor = Extractor::new(Arc::new(FakeRenderer::with_page(page())), log.clone());
        extractor.extract("https://example.com/", VIEWPORT).await.unwrap();

        let records = read_records(&log);
        let messages: Vec<&str> = records
            .iter()
            .map(|r| r["message"].as_str().unwrap())
            .collect();
        assert_eq!(
            messages,
            vec![
                "Starting critical CSS extraction",
                "Navigating to URL",
                "Extraction succeeded"
            ]
        );
        let success = &records[2];
        assert_eq!(success["level"], "info");
        assert_eq!(success["rulesCount"], 2);
        assert!(success["duration"].as_str().unwrap().ends_with("ms"));

        let mut renderer = FakeRenderer::with_page(page());
        renderer.navigation_error = Some(RenderError::Navigation("net::ERR_FAILED".to_string()));
        let log = file_log("failure");
        let extractor = Extractor::new(Arc::new(renderer), log.clone());
        extractor
            .extract("https://example.com/", VIEWPORT)
            .await
            .unwrap_err();

        let records = read_records(&log);
        let failure = records.last().unwrap();
        assert_eq!(failure["level"], "error");
        assert_eq!(failure["message"], "Extraction failed");
        assert_eq!(failure["error"], "net::ERR_FAILED");
        assert!(failure["duration"].as_str().unwrap().ends_with("ms"));
    }

    #[tokio::test]
    async fn test_release_failure_is_logged() {
        let mut renderer = FakeRenderer::with_page(page());
        renderer.release_error = Some(RenderError::Release("session gone".to_string()));
        let log = file_log("release");
        let extractor = Extractor::new(Arc::new(renderer), log.clone());

        extractor.extract("https://example.com/", VIEWPORT).await.unwrap();

        let records = read_records(&log);
        let release = records
            .iter()
            .find(|r| r["message"] == "Failed to release rendering session")
            .expect("release record");
        assert_eq!(release["level"], "error");
        assert!(release["error"].as_str().unwrap().contains("session gone"));

        // The outcome record still reports success
        assert_eq!(records.last().unwrap()["message"], "Extraction succeeded");
    }
}
