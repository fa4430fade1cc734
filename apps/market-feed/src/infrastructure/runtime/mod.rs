//! Process Runtime
//!
//! Start-up and shutdown plumbing shared by the three binaries: TLS
//! provider, logging and metrics, the health server, the shared store
//! and signal handling.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tonic::transport::server::TcpIncoming;

use crate::application::ports::{Clock, MarketStore, SystemClock};
use crate::application::services::MarketService;
use crate::infrastructure::config::{ReconnectSettings, StoreSettings};
use crate::infrastructure::exchange::{BackoffConfig, ExchangeSession, Ingestor, IngestorError};
use crate::infrastructure::health::{HealthCheck, HealthServer, HealthServerState};
use crate::infrastructure::metrics::init_metrics;
use crate::infrastructure::store::connect_store;
use crate::infrastructure::telemetry::{self, TelemetryConfig, TelemetryGuard};

/// Install the TLS provider and start logging and metrics.
///
/// # Errors
///
/// Returns an error if any of the global installs fail.
pub fn init_process(service_name: &str, log_level: &str) -> anyhow::Result<TelemetryGuard> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("a rustls crypto provider is already installed"))?;

    let mut telemetry_config = TelemetryConfig::from_env(service_name);
    telemetry_config.log_level = log_level.to_string();
    let guard = telemetry::init(&telemetry_config).context("failed to initialize telemetry")?;

    init_metrics().context("failed to install Prometheus recorder")?;

    Ok(guard)
}

/// Connect the store and wrap it in the market use-cases.
///
/// # Errors
///
/// Returns an error if the store backend is unreachable.
pub async fn market_service(settings: &StoreSettings) -> anyhow::Result<Arc<MarketService>> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store: Arc<dyn MarketStore> = connect_store(settings, Arc::clone(&clock))
        .await
        .context("failed to connect market store")?;
    Ok(Arc::new(MarketService::new(store, clock)))
}

/// Bind the gRPC listener with TCP keepalive, returning the bound address.
///
/// # Errors
///
/// Returns an error if the address is in use or not bindable.
pub async fn bind_incoming(
    addr: SocketAddr,
    keepalive: Duration,
) -> anyhow::Result<(TcpIncoming, SocketAddr)> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let local_addr = listener.local_addr().context("failed to read bound address")?;
    Ok((TcpIncoming::from(listener).with_keepalive(Some(keepalive)), local_addr))
}

/// Spawn the health server when a port is configured.
pub fn spawn_health_server(
    port: Option<u16>,
    component: Arc<dyn HealthCheck>,
    cancel: CancellationToken,
) -> Option<JoinHandle<()>> {
    let port = port?;
    let state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        component,
    ));
    let server = HealthServer::new(port, state, cancel);

    Some(tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    }))
}

/// Run one ingestor until a signal or a fatal error.
///
/// Exits 0 on signal-driven cancellation and 1 on bootstrap failure.
pub async fn run_ingestor<S>(
    session: S,
    reconnect: &ReconnectSettings,
    health_port: Option<u16>,
) -> ExitCode
where
    S: ExchangeSession + 'static,
{
    let cancel = CancellationToken::new();
    let ingestor = Ingestor::new(session, BackoffConfig::from(reconnect), cancel.clone());
    let exchange = ingestor.status().exchange();

    let health = spawn_health_server(health_port, ingestor.status(), cancel.clone());
    let signals = tokio::spawn(shutdown_signal(cancel.clone()));

    tracing::info!(exchange = %exchange, "Ingestor starting");
    let Err(error) = ingestor.run().await;

    // Bootstrap failures also stop the health server.
    cancel.cancel();
    signals.abort();
    if let Some(health) = health {
        let _ = health.await;
    }

    if is_clean_exit(&error) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn is_clean_exit(error: &IngestorError) -> bool {
    if error.is_cancelled() {
        tracing::info!("Ingestor stopped");
        true
    } else {
        tracing::error!(error = %error, "Ingestor failed");
        false
    }
}

/// Cancel `token` on SIGINT or SIGTERM.
pub async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
        () = token.cancelled() => return,
    }

    token.cancel();
}
