//! Redis Market Store
//!
//! `GET` / `SET EX` over a [`ConnectionManager`], which reconnects on its
//! own after connection loss. Every write resets the key's TTL.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::{decode_market, encode_market, market_key};
use crate::application::ports::MarketStore;
use crate::domain::errors::MarketError;
use crate::domain::market::{Exchange, Market};

/// Redis-backed [`MarketStore`].
#[derive(Clone)]
pub struct RedisMarketStore {
    conn: ConnectionManager,
    ttl_secs: u64,
}

impl RedisMarketStore {
    /// Connect to `url` (e.g. `redis://localhost:6379/`).
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Backend`] if the URL is invalid or the
    /// initial connection fails.
    pub async fn connect(url: &str, ttl: Duration) -> Result<Self, MarketError> {
        let client = redis::Client::open(url).map_err(backend)?;
        let conn = client.get_connection_manager().await.map_err(backend)?;

        tracing::info!(ttl_secs = ttl.as_secs(), "Connected to Redis market store");

        Ok(Self {
            conn,
            ttl_secs: ttl.as_secs().max(1),
        })
    }
}

impl std::fmt::Debug for RedisMarketStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisMarketStore")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

#[allow(clippy::needless_pass_by_value)]
fn backend(e: redis::RedisError) -> MarketError {
    MarketError::Backend(e.to_string())
}

#[async_trait]
impl MarketStore for RedisMarketStore {
    async fn get_market(
        &self,
        exchange: Exchange,
        trading_pair: &str,
    ) -> Result<Market, MarketError> {
        let key = market_key(exchange, trading_pair);
        let mut conn = self.conn.clone();

        let payload: Option<String> = conn.get(&key).await.map_err(backend)?;

        match payload {
            Some(payload) => decode_market(&payload),
            None => Err(MarketError::not_found(exchange, trading_pair)),
        }
    }

    async fn update_market(&self, market: &Market) -> Result<(), MarketError> {
        let key = market_key(market.exchange, &market.trading_pair);
        let payload = encode_market(market)?;
        let mut conn = self.conn.clone();

        conn.set_ex::<_, _, ()>(&key, payload, self.ttl_secs)
            .await
            .map_err(backend)
    }
}
