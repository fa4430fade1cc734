//! Health Check and Metrics Endpoint
//!
//! HTTP endpoint for health checks, component status reporting, and
//! Prometheus metrics. Each binary exposes one component: an ingestor or
//! the query server.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Kubernetes liveness probe (simple OK)
//! - `GET /readyz` - Kubernetes readiness probe (ingestor subscribed, or server serving)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::infrastructure::exchange::{IngestorState, IngestorStatus};
use crate::infrastructure::grpc::ServingStatus;
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Binary version.
    pub version: String,
    /// Process uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// The component this process runs.
    pub component: ComponentReport,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Receiving data or serving calls.
    Healthy,
    /// Reconnecting; expected to recover.
    Degraded,
    /// Stopped or draining.
    Unhealthy,
}

/// Point-in-time view of one component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentReport {
    /// Component name, e.g. `binance-ingestor`.
    pub name: String,
    /// Lifecycle state name.
    pub state: String,
    /// Derived health.
    pub status: HealthStatus,
    /// Sessions established (ingestors only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<u64>,
    /// Frames received (ingestors only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames_received: Option<u64>,
    /// Time of the last frame (ingestors only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_frame_at: Option<DateTime<Utc>>,
    /// Error that ended the last session, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Source of a [`ComponentReport`].
pub trait HealthCheck: Send + Sync {
    /// Current report.
    fn report(&self) -> ComponentReport;
}

impl HealthCheck for IngestorStatus {
    fn report(&self) -> ComponentReport {
        let state = self.state();
        let status = match state {
            IngestorState::Subscribed | IngestorState::Listening => HealthStatus::Healthy,
            IngestorState::Stopped => HealthStatus::Unhealthy,
            IngestorState::Idle | IngestorState::Bootstrapping | IngestorState::Closing => {
                HealthStatus::Degraded
            }
        };

        ComponentReport {
            name: format!("{}-ingestor", self.exchange()),
            state: state.to_string(),
            status,
            sessions: Some(self.sessions()),
            frames_received: Some(self.frames_received()),
            last_frame_at: self.last_frame_at(),
            last_error: self.last_error(),
        }
    }
}

impl HealthCheck for ServingStatus {
    fn report(&self) -> ComponentReport {
        let (state, status) = if self.is_serving() {
            ("serving", HealthStatus::Healthy)
        } else {
            ("not_serving", HealthStatus::Unhealthy)
        };

        ComponentReport {
            name: "market-server".to_string(),
            state: state.to_string(),
            status,
            sessions: None,
            frames_received: None,
            last_frame_at: None,
            last_error: None,
        }
    }
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the health server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    component: Arc<dyn HealthCheck>,
}

impl HealthServerState {
    /// Create new health server state.
    #[must_use]
    pub fn new(version: String, component: Arc<dyn HealthCheck>) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            component,
        }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Serve until the cancellation token fires.
    ///
    /// # Errors
    ///
    /// Returns [`HealthServerError::Bind`] if the port is taken and
    /// [`HealthServerError::Serve`] if the accept loop fails.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let port = self.port;
        let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port)))
            .await
            .map_err(|source| HealthServerError::Bind { port, source })?;
        tracing::info!(port, "Health server listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(HealthServerError::Serve)?;

        tracing::info!(port, "Health server stopped");
        Ok(())
    }
}

/// Routes served by [`HealthServer`].
pub fn router(state: Arc<HealthServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let code = if response.status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(response))
}

async fn liveness_handler() -> &'static str {
    "OK"
}

/// Ready only when the component reports healthy.
async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> (StatusCode, String) {
    let report = state.component.report();
    match report.status {
        HealthStatus::Healthy => (StatusCode::OK, "READY".to_string()),
        _ => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("NOT READY ({})", report.state),
        ),
    }
}

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

async fn metrics_handler() -> Response {
    match get_metrics_handle() {
        Some(handle) => ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], handle.render()).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

fn build_health_response(state: &HealthServerState) -> HealthResponse {
    let component = state.component.report();

    HealthResponse {
        status: component.status,
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        component,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// The listener could not bind.
    #[error("failed to bind health port {port}: {source}")]
    Bind {
        /// Requested port.
        port: u16,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The accept loop failed.
    #[error("health server failed: {0}")]
    Serve(#[source] std::io::Error),
}

// =============================================================================
// Tests
// =============================================================================
