//! HTTP surface: the extraction API, a health check and the static UI.

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::any::Any;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;

use crate::config::ServiceConfig;
use crate::extractor::{ExtractError, Extractor};
use crate::logging::EventLog;
use crate::results::ExtractionResult;
use crate::utils::format_duration;
use crate::validation::{RequestValidator, ValidationError};

/// Name reported by the health endpoint
pub const SERVICE_NAME: &str = "critical-css-extractor";

/// Message sent for failures whose details must stay on the server
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// State shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<Extractor>,
    pub validator: Arc<RequestValidator>,
    pub log: Arc<EventLog>,
    pub started: Instant,
}

impl AppState {
    pub fn new(extractor: Extractor, validator: RequestValidator, log: Arc<EventLog>) -> Self {
        Self {
            extractor: Arc::new(extractor),
            validator: Arc::new(validator),
            log,
            started: Instant::now(),
        }
    }
}

/// Errors returned by the API, each mapped to a status and an `{error}` body
#[derive(Debug)]
pub enum ApiError {
    /// The request was refused before extraction started
    Validation(ValidationError),
    /// Rendering or extraction failed
    Extraction(ExtractError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Extraction(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Build the application router.
///
/// Paths other than the API are served from `static_dir`.
pub fn router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    let panic_log = state.log.clone();

    Router::new()
        .route("/api/extract", post(extract_css))
        .route("/health", get(health))
        .fallback_service(ServeDir::new(static_dir.as_ref()))
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
            handle_panic(&panic_log, panic)
        }))
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(config: &ServiceConfig, state: AppState) -> std::io::Result<()> {
    let log = state.log.clone();
    let app = router(state, &config.static_dir);

    let listener =
        tokio::net::TcpListener::bind((config.bind_address.as_str(), config.port)).await?;

    log.info(
        "Server started",
        json!({
            "port": config.port,
            "env": config.environment,
            "version": env!("CARGO_PKG_VERSION"),
            "logLevel": config.log_level,
        }),
    );
    ::log::info!("API: http://localhost:{}/api/extract", config.port);
    if let Some(path) = log.path() {
        ::log::info!("Logs: {}", path.display());
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        ::log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    ::log::info!("Shutdown signal received");
}

/// `POST /api/extract`
async fn extract_css(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ExtractionResult>, ApiError> {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            let error = ValidationError::InvalidBody;
            state.log.warn(
                error.log_message(),
                json!({ "reason": rejection.body_text() }),
            );
            return Err(ApiError::Validation(error));
        }
    };

    let request = state.validator.validate(&body).map_err(|error| {
        state.log.warn(
            error.log_message(),
            json!({
                "url": body.get("url"),
                "width": body.get("width"),
                "height": body.get("height"),
                "reason": error.to_string(),
            }),
        );
        ApiError::Validation(error)
    })?;

    let result = state
        .extractor
        .extract(&request.url, request.viewport)
        .await
        .map_err(ApiError::Extraction)?;

    Ok(Json(result))
}

/// `GET /health`
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime": state.started.elapsed().as_secs_f64(),
    }))
}

/// Record one line per handled request
async fn log_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    let response = next.run(request).await;

    state.log.info(
        "HTTP request",
        json!({
            "method": method,
            "path": path,
            "status": response.status().as_u16(),
            "duration": format_duration(start.elapsed()),
            "ip": ip,
        }),
    );

    response
}

/// Turn a handler panic into a generic 500 after logging it
fn handle_panic(log: &EventLog, panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    log.error("Unhandled error", json!({ "error": detail }));

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": INTERNAL_ERROR_MESSAGE })),
    )
        .into_response()
}
