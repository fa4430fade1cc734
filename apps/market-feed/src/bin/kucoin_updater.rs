//! KuCoin Updater Binary
//!
//! Streams KuCoin market snapshots for the configured pairs into the
//! market store.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin kucoin-updater
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `KUCOIN_HOSTNAME`: REST base URL, e.g. `https://api.kucoin.com`
//! - `REDIS_HOST`: Redis host (unless `STORE_BACKEND=memory`)
//!
//! ## Optional
//! - `HTTP_CLIENT_TIMEOUT`: REST timeout (default: 10s)
//! - `TRADING_PAIRS_PATH`: Pair list (default: data/trading_pairs.yaml)
//! - `REDIS_PORT`, `STORE_BACKEND`, `MARKET_TTL_SECS`: Store settings
//! - `RECONNECT_INITIAL_DELAY_MS`, `RECONNECT_MAX_DELAY_SECS`: Session backoff
//! - `HEALTH_PORT`: Health and metrics HTTP port (default: disabled)
//! - `LOG_LEVEL`: Log filter (default: debug)

use std::process::ExitCode;

use anyhow::Context;
use market_feed::Exchange;
use market_feed::infrastructure::config::{KucoinUpdaterConfig, load_dotenv, load_trading_pairs};
use market_feed::infrastructure::exchange::http::build_client;
use market_feed::infrastructure::exchange::kucoin::KucoinSession;
use market_feed::infrastructure::runtime;

const SERVICE_NAME: &str = "kucoin-updater";

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{SERVICE_NAME}: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    load_dotenv();
    let config = KucoinUpdaterConfig::from_env().context("invalid configuration")?;
    let _telemetry_guard = runtime::init_process(SERVICE_NAME, &config.log_level)?;

    tracing::info!(hostname = %config.kucoin.hostname, "Starting KuCoin updater");

    let pairs = load_trading_pairs(&config.trading_pairs_path)?.require(Exchange::Kucoin)?;
    let http = build_client(config.http.timeout).context("failed to build HTTP client")?;
    let service = runtime::market_service(&config.store).await?;

    let session = KucoinSession::new(&config.kucoin, http, &pairs, service);
    Ok(runtime::run_ingestor(session, &config.reconnect, config.health_port).await)
}
