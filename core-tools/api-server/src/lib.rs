//! API Server
//!
//! HTTP boundary of the builder. Requests are validated and authenticated
//! here, handed to the engine through a [`SubmitHandle`], and acknowledged
//! before any generation or publishing happens.
//!
//! # Endpoints
//!
//! - POST /api/build - Accept a round 1 or round 2 build request
//! - GET / - Liveness
//! - GET /api/status - Server status
//! - GET /favicon.ico - Placeholder icon

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use sdk::{
    validation, Acknowledgment, BuildRequest, EngineError, ErrorExt, SecretString, SubmitHandle,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

/// 1x1 transparent PNG
static FAVICON_PNG: [u8; 67] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Request body cap used when none is configured. Attachments arrive inline
/// as data URIs, so this sits well above axum's 2 MB default.
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// State shared across handlers
#[derive(Clone)]
pub struct ApiState {
    pub submitter: SubmitHandle,
    /// Shared secret callers must present. `None` rejects every request.
    pub secret: Option<SecretString>,
    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
}

/// Build the router for the given state
pub fn router(state: ApiState) -> Router {
    let body_limit = state.max_body_bytes;
    Router::new()
        .route("/", get(index_handler))
        .route("/api/build", post(build_handler))
        .route("/api/status", get(status_handler))
        .route("/favicon.ico", get(favicon_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn error_response(err: &EngineError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({
            "error": err.to_string(),
            "hint": err.user_hint(),
        })),
    )
        .into_response()
}

impl ApiState {
    fn secret_matches(&self, provided: &str) -> bool {
        self.secret
            .as_ref()
            .is_some_and(|secret| secret.matches(provided))
    }
}

/// Accept a build request
async fn build_handler(State(state): State<ApiState>, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected request with malformed JSON");
            return error_response(&EngineError::validation("body", "Invalid JSON body"));
        }
    };

    if let Err(e) = validation::validate_request(&payload) {
        tracing::warn!(error = %e, "Rejected invalid build request");
        return error_response(&e);
    }

    let provided = payload
        .get("secret")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !state.secret_matches(provided) {
        tracing::warn!("Rejected build request with invalid secret");
        return error_response(&EngineError::Unauthorized);
    }

    let request: BuildRequest = match serde_json::from_value(payload) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Build request does not match the expected shape");
            return error_response(&EngineError::validation(
                "body",
                format!("Invalid request: {}", e),
            ));
        }
    };

    let task = request.task.clone();
    let round = request.round;

    if let Err(e) = state.submitter.submit(request) {
        tracing::error!(task = %task, round = %round, error = %e, "Failed to queue build");
        return error_response(&e);
    }

    tracing::info!(task = %task, round = %round, "Build request accepted");
    Json(Acknowledgment::accepted(task, round, timestamp())).into_response()
}

async fn index_handler() -> Json<Value> {
    Json(json!({
        "status": "online",
        "message": "Application builder is running",
        "endpoint": "/api/build (POST)",
        "ts": timestamp(),
    }))
}

async fn status_handler() -> Json<Value> {
    Json(json!({
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn favicon_handler() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/png")],
        &FAVICON_PNG[..],
    )
        .into_response()
}

/// Running HTTP server
pub struct ApiServer {
    addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl ApiServer {
    /// Bind `bind` and serve in the background
    pub async fn start(bind: SocketAddr, state: ApiState) -> Result<Self, EngineError> {
        let listener = tokio::net::TcpListener::bind(bind)
            .await
            .map_err(|e| EngineError::Network(format!("Failed to bind to {}: {}", bind, e)))?;

        let addr = listener
            .local_addr()
            .map_err(|e| EngineError::Network(format!("Failed to get local address: {}", e)))?;

        let app = router(state);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            tracing::info!("API server listening on http://{}", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_rx.await.ok();
                    tracing::info!("API server shutting down gracefully");
                })
                .await
                .unwrap_or_else(|e| {
                    tracing::error!("API server error: {}", e);
                });
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.handle.await {
            tracing::error!("API server task failed: {}", e);
        }
    }

    /// Wait until the server stops on its own
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            tracing::error!("API server task failed: {}", e);
        }
    }
}
