//! Market Server Binary
//!
//! Serves `arbitrage.v1.MarketDataService/GetMarket` over the market
//! store.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin market-server
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `HOST`: Bind host, an IP address or a resolvable hostname
//! - `REDIS_HOST`: Redis host (unless `STORE_BACKEND=memory`)
//!
//! ## Optional
//! - `PORT`: gRPC port (default: 9000)
//! - `SHUTDOWN_GRACE_SECS`: Drain window for in-flight calls (default: 30)
//! - `REDIS_PORT`, `STORE_BACKEND`, `MARKET_TTL_SECS`: Store settings
//! - `HEALTH_PORT`: Health and metrics HTTP port (default: disabled)
//! - `LOG_LEVEL`: Log filter (default: debug)

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use market_feed::infrastructure::config::{MarketServerConfig, load_dotenv};
use market_feed::infrastructure::runtime;
use market_feed::proto::market_data_service_server::MarketDataServiceServer;
use market_feed::{MarketDataServer, ServingStatus};
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

const SERVICE_NAME: &str = "market-server";

/// HTTP/2 and TCP keepalive period.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{SERVICE_NAME}: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    load_dotenv();
    let config = MarketServerConfig::from_env().context("invalid configuration")?;
    let _telemetry_guard = runtime::init_process(SERVICE_NAME, &config.log_level)?;

    let addr = config.server.resolve_bind_addr().await?;
    let grace = config.server.shutdown_grace;
    let service = runtime::market_service(&config.store).await?;
    let (incoming, local_addr) = runtime::bind_incoming(addr, KEEPALIVE_INTERVAL).await?;

    let shutdown = CancellationToken::new();
    let health_shutdown = CancellationToken::new();
    let serving = Arc::new(ServingStatus::new());

    let health = runtime::spawn_health_server(
        config.health_port,
        Arc::clone(&serving) as _,
        health_shutdown.clone(),
    );
    tokio::spawn(runtime::shutdown_signal(shutdown.clone()));

    let drain = {
        let shutdown = shutdown.clone();
        let serving = Arc::clone(&serving);
        async move {
            shutdown.cancelled().await;
            serving.set_not_serving();
            tracing::info!(grace_secs = grace.as_secs(), "Draining in-flight calls");
        }
    };

    let router = Server::builder()
        .http2_keepalive_interval(Some(KEEPALIVE_INTERVAL))
        .add_service(MarketDataServiceServer::new(MarketDataServer::new(service)));
    let mut server = tokio::spawn(router.serve_with_incoming_shutdown(incoming, drain));

    serving.set_serving();
    tracing::info!(addr = %local_addr, "Market server listening");

    let result = tokio::select! {
        result = &mut server => result,
        () = shutdown.cancelled() => match tokio::time::timeout(grace, &mut server).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Grace window elapsed, aborting in-flight calls");
                server.abort();
                Ok(Ok(()))
            }
        },
    };

    serving.set_not_serving();
    health_shutdown.cancel();
    if let Some(health) = health {
        let _ = health.await;
    }

    result
        .context("gRPC server task failed")?
        .context("gRPC server error")?;

    tracing::info!("Market server stopped");
    Ok(())
}
