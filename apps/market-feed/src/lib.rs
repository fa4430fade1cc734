#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Market Feed - Cross-Exchange Ticker Snapshots
//!
//! Ingestors that keep one WebSocket session per exchange (Binance,
//! KuCoin), normalize ticker frames into a canonical [`Market`], and
//! write them to a TTL'd store behind a freshness guard. A gRPC server
//! answers `GetMarket` with the latest snapshot from every exchange.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Canonical model and errors
//!   - `market`: `Exchange`, `TradingPair`, `Market`
//!   - `errors`: `MarketError`, `DomainParseError`
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: `MarketStore`, `Clock`, `MarketUpdater`, `MarketQuery`
//!   - `services`: `MarketService` (freshness guard, fan-out reads)
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `exchange`: Reconnecting ingestors for Binance and KuCoin
//!   - `store`: Redis and in-memory stores
//!   - `grpc`: `MarketDataService` query server
//!   - `config`: Environment and trading-pair configuration
//!   - `health`: Health check and metrics HTTP endpoint
//!
//! # Data Flow
//!
//! ```text
//! Binance WS --> binance-updater --+
//!                                  +--> MarketService --> store <-- market-server <-- gRPC clients
//! KuCoin WS  --> kucoin-updater  --+    (freshness guard)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Canonical market types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::errors::{DomainParseError, MarketError};
pub use domain::market::{Exchange, Market, TradingPair};

// Ports and services
pub use application::ports::{
    Clock, ManualClock, MarketQuery, MarketStore, MarketUpdater, SystemClock,
};
pub use application::services::MarketService;

// Infrastructure config
pub use infrastructure::config::{
    BinanceUpdaterConfig, ConfigError, KucoinUpdaterConfig, MarketServerConfig,
    TradingPairsConfig,
};

// Ingestors
pub use infrastructure::exchange::binance::BinanceSession;
pub use infrastructure::exchange::kucoin::KucoinSession;
pub use infrastructure::exchange::{Ingestor, IngestorError, IngestorState, IngestorStatus};

// Stores
pub use infrastructure::store::{InMemoryMarketStore, RedisMarketStore};

// gRPC server (for integration tests)
pub use infrastructure::grpc::{
    MarketDataServer, ServingStatus,
    proto::arbitrage::v1 as proto,
};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
