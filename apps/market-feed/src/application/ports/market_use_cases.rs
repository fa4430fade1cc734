//! Market Use-Case Ports (Driver Ports)
//!
//! Narrow capability sets handed to the outer adapters: ingestors only
//! write, the RPC server only reads.

use async_trait::async_trait;

use crate::domain::errors::MarketError;
use crate::domain::market::Market;

/// Capability used by exchange ingestors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketUpdater: Send + Sync {
    /// Publish a normalized snapshot, subject to the freshness guard.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidTimestamp`] for stale snapshots and
    /// store failures otherwise.
    async fn update_market(&self, market: Market) -> Result<(), MarketError>;
}

/// Capability used by the query RPC.
#[async_trait]
pub trait MarketQuery: Send + Sync {
    /// Snapshots for `trading_pair` on every exchange that has one, in
    /// exchange enumeration order.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] when no exchange has a snapshot.
    async fn get_markets(&self, trading_pair: &str) -> Result<Vec<Market>, MarketError>;
}
