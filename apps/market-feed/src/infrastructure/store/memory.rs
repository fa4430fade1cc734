//! In-Memory Market Store
//!
//! Process-local store with the same key layout, encoding and TTL
//! semantics as the Redis backend. Expiry is driven by the injected
//! [`Clock`], so tests control it without sleeping.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;

use super::{decode_market, encode_market, market_key};
use crate::application::ports::{Clock, MarketStore};
use crate::domain::errors::MarketError;
use crate::domain::market::{Exchange, Market};

#[derive(Debug, Clone)]
struct Entry {
    payload: String,
    expires_at: DateTime<Utc>,
}

/// In-memory [`MarketStore`] with per-key TTL.
pub struct InMemoryMarketStore {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl InMemoryMarketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
        }
    }

    /// Number of keys currently held, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if no keys are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl std::fmt::Debug for InMemoryMarketStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMarketStore")
            .field("keys", &self.len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MarketStore for InMemoryMarketStore {
    async fn get_market(
        &self,
        exchange: Exchange,
        trading_pair: &str,
    ) -> Result<Market, MarketError> {
        let key = market_key(exchange, trading_pair);
        let now = self.clock.now();

        let payload = {
            let entries = self.entries.read();
            match entries.get(&key) {
                Some(entry) if entry.expires_at > now => Some(entry.payload.clone()),
                Some(_) => None,
                None => return Err(MarketError::not_found(exchange, trading_pair)),
            }
        };

        match payload {
            Some(payload) => decode_market(&payload),
            None => {
                let mut entries = self.entries.write();
                if entries.get(&key).is_some_and(|entry| entry.expires_at <= now) {
                    entries.remove(&key);
                }
                Err(MarketError::not_found(exchange, trading_pair))
            }
        }
    }

    async fn update_market(&self, market: &Market) -> Result<(), MarketError> {
        let key = market_key(market.exchange, &market.trading_pair);
        let entry = Entry {
            payload: encode_market(market)?,
            expires_at: self
                .clock
                .now()
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        self.entries.write().insert(key, entry);
        Ok(())
    }
}
