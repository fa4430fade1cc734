//! Market Service
//!
//! Implements the two market use-cases over a [`MarketStore`]:
//!
//! - **update**: read the stored record, reject strictly older input,
//!   write everything else (equal timestamps overwrite).
//! - **query**: read every exchange in enumeration order and return the
//!   subset that exists.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::ports::{Clock, MarketQuery, MarketStore, MarketUpdater};
use crate::domain::errors::MarketError;
use crate::domain::market::{Exchange, Market};
use crate::infrastructure::metrics::{self, UpdateOutcome};

/// Market use-cases over a shared store.
#[derive(Clone)]
pub struct MarketService {
    store: Arc<dyn MarketStore>,
    clock: Arc<dyn Clock>,
}

impl MarketService {
    /// Create a service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn MarketStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    async fn guarded_update(&self, market: &Market) -> Result<(), MarketError> {
        match self
            .store
            .get_market(market.exchange, &market.trading_pair)
            .await
        {
            Ok(stored) if stored.timestamp > market.timestamp => {
                return Err(MarketError::InvalidTimestamp {
                    stored: stored.timestamp,
                    received: market.timestamp,
                });
            }
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        self.store.update_market(market).await
    }
}

#[async_trait]
impl MarketUpdater for MarketService {
    async fn update_market(&self, market: Market) -> Result<(), MarketError> {
        let result = self.guarded_update(&market).await;

        let outcome = match &result {
            Ok(()) => {
                let lag = self.clock.now() - market.timestamp;
                metrics::record_update_lag(market.exchange, lag);
                UpdateOutcome::Stored
            }
            Err(MarketError::InvalidTimestamp { .. }) => UpdateOutcome::Stale,
            Err(_) => UpdateOutcome::Error,
        };
        metrics::record_market_update(market.exchange, outcome);

        result
    }
}

#[async_trait]
impl MarketQuery for MarketService {
    async fn get_markets(&self, trading_pair: &str) -> Result<Vec<Market>, MarketError> {
        let mut markets = Vec::with_capacity(Exchange::ALL.len());

        for exchange in Exchange::ALL {
            match self.store.get_market(exchange, trading_pair).await {
                Ok(market) => markets.push(market),
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    tracing::warn!(
                        exchange = %exchange,
                        trading_pair,
                        error = %e,
                        "Failed to read market, skipping exchange"
                    );
                }
            }
        }

        if markets.is_empty() {
            return Err(MarketError::NotFound {
                trading_pair: trading_pair.to_string(),
                exchange: None,
            });
        }

        Ok(markets)
    }
}
