//! In-memory renderer serving a canned page snapshot.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{RenderError, Renderer, Session};
use crate::validation::Viewport;

/// Shared record of what the renderer was asked to do
#[derive(Debug, Default)]
pub struct Calls {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub viewports: Mutex<Vec<Viewport>>,
    pub navigations: Mutex<Vec<(String, Duration)>>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeRenderer {
    pub page: Value,
    pub acquire_error: Option<RenderError>,
    pub navigation_error: Option<RenderError>,
    pub release_error: Option<RenderError>,
    pub calls: Arc<Calls>,
}

impl FakeRenderer {
    /// Renderer whose pages evaluate to `page`
    pub fn with_page(page: Value) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn acquire_session(&self, viewport: Viewport) -> Result<Box<dyn Session>, RenderError> {
        if let Some(error) = &self.acquire_error {
            return Err(error.clone());
        }
        self.calls.acquired.fetch_add(1, Ordering::SeqCst);
        self.calls.viewports.lock().unwrap().push(viewport);

        Ok(Box::new(FakeSession {
            renderer: self.clone(),
        }))
    }
}

struct FakeSession {
    renderer: FakeRenderer,
}

#[async_trait]
impl Session for FakeSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError> {
        self.renderer
            .calls
            .navigations
            .lock()
            .unwrap()
            .push((url.to_string(), timeout));
        match &self.renderer.navigation_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn evaluate(&mut self, _script: &str) -> Result<Value, RenderError> {
        Ok(self.renderer.page.clone())
    }

    async fn release(self: Box<Self>) -> Result<(), RenderError> {
        self.renderer.calls.released.fetch_add(1, Ordering::SeqCst);
        match &self.renderer.release_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
