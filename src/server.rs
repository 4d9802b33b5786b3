//! HTTP front end.
//!
//! | Route | Description |
//! |-------|-------------|
//! | `POST /api/generate-pdf` | intake JSON → protected PDF or `{ "error": … }` |
//! | `GET  /healthz`          | liveness check |
//!
//! When the client disconnects, axum drops the handler future, which drops
//! the pipeline run and any request still in flight.

use crate::auth::{bearer_token, AuthError, IdentityProvider};
use crate::intake::IntakeRecord;
use crate::orchestrator::{MemoDocument, MemoPipeline};
use crate::response::{ApiError, Redactor};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Path of the document endpoint.
pub const GENERATE_ROUTE: &str = "/api/generate-pdf";

/// Shared application state.
pub struct AppState {
    pub pipeline: Arc<MemoPipeline>,
    pub redactor: Redactor,
    pub identity: Option<Arc<dyn IdentityProvider>>,
    /// Upper bound on one pipeline run; `None` waits as long as it takes.
    pub request_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(pipeline: Arc<MemoPipeline>, redactor: Redactor) -> Self {
        Self {
            pipeline,
            redactor,
            identity: None,
            request_timeout: None,
        }
    }

    /// Require a bearer token resolvable by `provider`.
    pub fn with_identity(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(provider);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(GENERATE_ROUTE, post(generate_pdf))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Memo server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
}

async fn healthz() -> &'static str {
    "ok"
}

async fn generate_pdf(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<MemoDocument, ApiError> {
    // ── Authenticate ─────────────────────────────────────────────────────
    let caller = match state.identity {
        Some(ref provider) => {
            let token = bearer_token(&headers).ok_or(AuthError::MissingToken)?;
            let identity = provider.identify(token).await?;
            Some(identity.subject)
        }
        None => None,
    };

    // ── Parse intake ─────────────────────────────────────────────────────
    let Json(value) = payload.map_err(|e| ApiError::internal(e.body_text()))?;
    let intake =
        IntakeRecord::from_value(value).map_err(|e| ApiError::from_memo(&e, &state.redactor))?;
    info!(
        "Memo request from {}",
        caller.as_deref().unwrap_or("anonymous caller")
    );

    // ── Run pipeline ─────────────────────────────────────────────────────
    let result = match state.request_timeout {
        Some(timeout) => state.pipeline.run_with_deadline(&intake, timeout).await,
        None => state.pipeline.run(&intake).await,
    };

    result.map_err(|e| {
        let api = ApiError::from_memo(&e, &state.redactor);
        error!("[{}] {}", GENERATE_ROUTE, api.message);
        api
    })
}
