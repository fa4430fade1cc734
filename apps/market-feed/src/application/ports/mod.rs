//! Port Interfaces
//!
//! Contracts between the market use-cases and the adapters around them,
//! following the Hexagonal Architecture pattern.
//!
//! ## Driven Ports (Outbound)
//!
//! - `MarketStore`: Keyed, TTL'd persistence of the latest `Market`
//! - `Clock`: Wall-clock source, replaceable in tests
//!
//! ## Driver Ports (Inbound)
//!
//! - `MarketUpdater`: Used by exchange ingestors to publish snapshots
//! - `MarketQuery`: Used by the RPC server to read snapshots

mod clock;
mod market_store;
mod market_use_cases;

pub use clock::{Clock, ManualClock, SystemClock};
#[cfg(test)]
pub use market_store::MockMarketStore;
pub use market_store::MarketStore;
#[cfg(test)]
pub use market_use_cases::MockMarketUpdater;
pub use market_use_cases::{MarketQuery, MarketUpdater};
