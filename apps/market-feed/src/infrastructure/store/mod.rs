//! Market Store Adapters
//!
//! Implementations of [`MarketStore`](crate::application::ports::MarketStore).
//! Both backends share the key layout and the JSON value encoding:
//!
//! ```text
//! market:<exchange>:<trading pair>  ->  {"TradingPair":"BTC/USDT","Exchange":"binance",...}
//! ```

mod memory;
mod redis_store;

pub use memory::InMemoryMarketStore;
pub use redis_store::RedisMarketStore;

use std::sync::Arc;

use crate::application::ports::{Clock, MarketStore};
use crate::domain::errors::MarketError;
use crate::domain::market::{Exchange, Market};
use crate::infrastructure::config::{StoreBackend, StoreSettings, redis_url};

/// Default retention for stored markets.
pub const DEFAULT_MARKET_TTL: std::time::Duration = std::time::Duration::from_secs(600);

/// Store key for `(exchange, trading_pair)`.
#[must_use]
pub fn market_key(exchange: Exchange, trading_pair: &str) -> String {
    format!("market:{exchange}:{trading_pair}")
}

/// Encode a market as the stored JSON value.
///
/// # Errors
///
/// Returns [`MarketError::Codec`] if serialization fails.
pub fn encode_market(market: &Market) -> Result<String, MarketError> {
    Ok(serde_json::to_string(market)?)
}

/// Decode a stored JSON value.
///
/// # Errors
///
/// Returns [`MarketError::Codec`] for malformed values.
pub fn decode_market(payload: &str) -> Result<Market, MarketError> {
    Ok(serde_json::from_str(payload)?)
}

/// Open the configured backend.
///
/// # Errors
///
/// Returns [`MarketError::Backend`] if Redis is unreachable.
pub async fn connect_store(
    settings: &StoreSettings,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn MarketStore>, MarketError> {
    match &settings.backend {
        StoreBackend::Redis { host, port } => {
            let store = RedisMarketStore::connect(&redis_url(host, *port), settings.market_ttl).await?;
            tracing::info!(host = %host, port, "Connected to Redis store");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; markets are not shared between processes");
            Ok(Arc::new(InMemoryMarketStore::new(settings.market_ttl, clock)))
        }
    }
}
