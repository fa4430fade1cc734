//! Prometheus Metrics Module
//!
//! Exposes ingestion and query metrics via Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Frames**: WebSocket frames received and dropped per exchange
//! - **Updates**: Market writes by outcome, plus ingestion lag
//! - **Sessions**: Ingestor session starts, failures and keep-alive errors
//! - **RPC**: Query requests by status code
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port. Recording
//! functions are no-ops until [`init_metrics`] installs the recorder.

use std::sync::OnceLock;

use chrono::TimeDelta;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::market::Exchange;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Subsequent calls return the handle installed by the first one.
///
/// # Errors
///
/// Returns an error if the global recorder cannot be installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "market_feed_frames_received_total",
        "Total WebSocket data frames received from exchanges"
    );
    describe_counter!(
        "market_feed_frames_dropped_total",
        "Total frames dropped by reason (decode, parse, unknown_symbol)"
    );
    describe_counter!(
        "market_feed_market_updates_total",
        "Total market writes by outcome (stored, stale, error)"
    );
    describe_histogram!(
        "market_feed_market_update_lag_seconds",
        "Delay between exchange event time and store write"
    );
    describe_counter!(
        "market_feed_sessions_started_total",
        "Total ingestor sessions that completed bootstrap"
    );
    describe_counter!(
        "market_feed_session_failures_total",
        "Total ingestor sessions that ended with a transport error"
    );
    describe_counter!(
        "market_feed_keepalive_failures_total",
        "Total failed keep-alive or ping attempts"
    );
    describe_counter!(
        "market_feed_rpc_requests_total",
        "Total query RPC requests by method and status code"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Why a frame was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Payload was not the expected JSON shape.
    Decode,
    /// A numeric or timestamp field did not parse.
    Parse,
    /// Symbol not in the configured trading pairs.
    UnknownSymbol,
}

impl DropReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Parse => "parse",
            Self::UnknownSymbol => "unknown_symbol",
        }
    }
}

/// Result of a market write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Written to the store.
    Stored,
    /// Rejected by the freshness guard.
    Stale,
    /// Store failure.
    Error,
}

impl UpdateOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Stale => "stale",
            Self::Error => "error",
        }
    }
}

/// Record a data frame received from an exchange.
pub fn record_frame_received(exchange: Exchange) {
    counter!(
        "market_feed_frames_received_total",
        "exchange" => exchange.as_str()
    )
    .increment(1);
}

/// Record a dropped frame.
pub fn record_frame_dropped(exchange: Exchange, reason: DropReason) {
    counter!(
        "market_feed_frames_dropped_total",
        "exchange" => exchange.as_str(),
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// Record the outcome of a market write.
pub fn record_market_update(exchange: Exchange, outcome: UpdateOutcome) {
    counter!(
        "market_feed_market_updates_total",
        "exchange" => exchange.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Record ingestion lag. Negative lag (exchange clock ahead) records as zero.
pub fn record_update_lag(exchange: Exchange, lag: TimeDelta) {
    let seconds = lag.to_std().map_or(0.0, |lag| lag.as_secs_f64());
    histogram!(
        "market_feed_market_update_lag_seconds",
        "exchange" => exchange.as_str()
    )
    .record(seconds);
}

/// Record a session that completed bootstrap.
pub fn record_session_started(exchange: Exchange) {
    counter!(
        "market_feed_sessions_started_total",
        "exchange" => exchange.as_str()
    )
    .increment(1);
}

/// Record a session that ended with a transport error.
pub fn record_session_failure(exchange: Exchange) {
    counter!(
        "market_feed_session_failures_total",
        "exchange" => exchange.as_str()
    )
    .increment(1);
}

/// Record a failed keep-alive or ping.
pub fn record_keepalive_failure(exchange: Exchange) {
    counter!(
        "market_feed_keepalive_failures_total",
        "exchange" => exchange.as_str()
    )
    .increment(1);
}

/// Record a query RPC.
pub fn record_rpc_request(method: &'static str, code: tonic::Code) {
    counter!(
        "market_feed_rpc_requests_total",
        "method" => method,
        "code" => code_label(code)
    )
    .increment(1);
}

const fn code_label(code: tonic::Code) -> &'static str {
    match code {
        tonic::Code::Ok => "ok",
        tonic::Code::NotFound => "not_found",
        tonic::Code::InvalidArgument => "invalid_argument",
        tonic::Code::Internal => "internal",
        tonic::Code::Unavailable => "unavailable",
        _ => "other",
    }
}

// =============================================================================
// Tests
// =============================================================================
