//! gRPC Query Server
//!
//! Implements `arbitrage.v1.MarketDataService`. The single unary
//! `GetMarket` call fans out over every exchange through the
//! [`MarketQuery`](crate::application::ports::MarketQuery) port and
//! returns whatever snapshots are live.

pub mod server;

// Allow clippy warnings and missing docs in generated code
#[allow(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
pub mod proto {
    pub mod arbitrage {
        pub mod v1 {
            include!(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/../../packages/schema-gen/rust/arbitrage/v1/arbitrage.v1.rs"
            ));
        }
    }
}

pub use server::{MarketDataServer, ServingStatus, market_to_proto};
