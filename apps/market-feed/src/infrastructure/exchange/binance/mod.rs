//! Binance Ingestor
//!
//! Listen-key bootstrap, per-pair `@ticker` subscriptions and
//! `24hrTicker` decoding.

pub mod messages;
pub mod rest;
pub mod session;

pub use rest::BinanceRestClient;
pub use session::BinanceSession;
