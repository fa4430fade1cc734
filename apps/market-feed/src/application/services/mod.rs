//! Application Services
//!
//! - `MarketService`: Freshness-guarded updates and multi-exchange reads

mod market;

pub use market::MarketService;
