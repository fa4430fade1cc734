//! Exchange Ingestors
//!
//! Reconnecting WebSocket ingestion for each supported exchange. The
//! shared pieces live here; vendor bootstrap and frame decoding live in
//! the per-exchange modules.
//!
//! # Session Lifecycle
//!
//! ```text
//! Idle -> Bootstrapping -> Subscribed -> Listening -> Closing -> Idle
//!              |                                                  ^
//!              +-- failure: fatal             transport error ----+
//!
//! cancellation from any state -> Stopped
//! ```
//!
//! # Components
//!
//! - [`connection`]: WebSocket handle with a single writer task
//! - [`session`]: The state machine driver shared by all exchanges
//! - [`keepalive`]: Periodic tasks scoped to one session
//! - [`symbols`]: Canonical pair <-> native symbol lookup

pub mod binance;
pub mod connection;
pub mod error;
pub mod http;
pub mod keepalive;
pub mod kucoin;
pub mod reconnect;
pub mod session;
pub mod status;
pub mod symbols;

pub use connection::{WsConnection, WsSender};
pub use error::{BootstrapError, FrameError, IngestorError, SendError};
pub use reconnect::{Backoff, BackoffConfig};
pub use session::{ExchangeSession, Ingestor};
pub use status::{IngestorState, IngestorStatus};
pub use symbols::SymbolMap;
