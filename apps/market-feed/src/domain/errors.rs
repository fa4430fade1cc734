//! Domain Errors
//!
//! Error kinds shared by the store, the market use-cases and the RPC
//! surface. `NotFound` is a distinguished signal: it is skipped during
//! fan-out reads and surfaced to RPC callers as not-found.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::market::Exchange;

/// Errors from reading or writing markets.
#[derive(Debug, Error)]
pub enum MarketError {
    /// No live record exists (absent or expired).
    #[error(
        "market not found for {trading_pair}{}",
        .exchange.map(|e| format!(" on {e}")).unwrap_or_default()
    )]
    NotFound {
        /// Requested canonical pair.
        trading_pair: String,
        /// Exchange that was read, when the lookup was for a single venue.
        exchange: Option<Exchange>,
    },

    /// The freshness guard rejected a write older than the stored record.
    #[error("invalid market timestamp: stored {stored} is after {received}")]
    InvalidTimestamp {
        /// Timestamp of the record already stored.
        stored: DateTime<Utc>,
        /// Timestamp of the rejected update.
        received: DateTime<Utc>,
    },

    /// Store backend failure (I/O, connection, protocol).
    #[error("store backend error: {0}")]
    Backend(String),

    /// Stored value could not be encoded or decoded.
    #[error("market codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl MarketError {
    /// Not-found for a single exchange lookup.
    #[must_use]
    pub fn not_found(exchange: Exchange, trading_pair: impl Into<String>) -> Self {
        Self::NotFound {
            trading_pair: trading_pair.into(),
            exchange: Some(exchange),
        }
    }

    /// Check if this is the not-found signal.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors from parsing canonical identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainParseError {
    /// Exchange name not in the enumeration.
    #[error("unknown exchange: {0}")]
    UnknownExchange(String),

    /// Trading pair not in `BASE/QUOTE` form.
    #[error("invalid trading pair {0:?}: expected BASE/QUOTE")]
    InvalidTradingPair(String),
}
