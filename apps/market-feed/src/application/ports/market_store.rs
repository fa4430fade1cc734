//! Market Store Port (Driven Port)
//!
//! Persistence of the latest accepted `Market` per (exchange, pair).

use async_trait::async_trait;

use crate::domain::errors::MarketError;
use crate::domain::market::{Exchange, Market};

/// Keyed market persistence with bounded retention.
///
/// The store overwrites unconditionally; freshness ordering is the
/// caller's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Read the live record for `(exchange, trading_pair)`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] when the key is absent or expired,
    /// and any backend or decode failure verbatim.
    async fn get_market(&self, exchange: Exchange, trading_pair: &str)
    -> Result<Market, MarketError>;

    /// Write `market` under its key and reset the retention TTL.
    ///
    /// # Errors
    ///
    /// Returns backend or encode failures.
    async fn update_market(&self, market: &Market) -> Result<(), MarketError>;
}
