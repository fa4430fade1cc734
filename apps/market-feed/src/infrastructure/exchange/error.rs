//! Ingestor Errors
//!
//! - [`IngestorError`]: why an ingestor stopped or a session ended
//! - [`BootstrapError`]: fatal session-setup failures
//! - [`SendError`]: WebSocket write failures
//! - [`FrameError`]: single-frame drops

use tokio_tungstenite::tungstenite;

use crate::domain::market::Exchange;
use crate::infrastructure::exchange::http::HttpError;
use crate::infrastructure::metrics::DropReason;

/// Why an ingestor run or session ended.
#[derive(Debug, thiserror::Error)]
pub enum IngestorError {
    /// Session setup failed; indicates misconfiguration and is fatal.
    #[error("{exchange} bootstrap failed: {source}")]
    Bootstrap {
        /// Exchange being bootstrapped.
        exchange: Exchange,
        /// Underlying failure.
        #[source]
        source: BootstrapError,
    },

    /// WebSocket read failure.
    #[error("websocket transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    /// Peer closed the connection or the stream ended.
    #[error("websocket closed by peer")]
    ConnectionClosed,

    /// External cancellation.
    #[error("ingestor cancelled")]
    Cancelled,
}

impl IngestorError {
    /// Wrap a bootstrap failure.
    #[must_use]
    pub const fn bootstrap(exchange: Exchange, source: BootstrapError) -> Self {
        Self::Bootstrap { exchange, source }
    }

    /// Check if this is a clean cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Session setup failures.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Token or listen-key request failed.
    #[error("token request failed: {0}")]
    Http(#[from] HttpError),

    /// Bullet response listed no instance servers.
    #[error("bullet response has no instance servers")]
    NoInstanceServers,

    /// WebSocket handshake failed.
    #[error("websocket dial failed: {0}")]
    Dial(#[source] tungstenite::Error),

    /// Subscription frame could not be sent.
    #[error("subscribe failed: {0}")]
    Subscribe(#[source] SendError),
}

/// WebSocket write failures.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The writer task has stopped (connection closing or closed).
    #[error("websocket writer has stopped")]
    WriterClosed,

    /// Frame could not be serialized.
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    /// Transport rejected the frame.
    #[error("websocket write failed: {0}")]
    Transport(#[from] tungstenite::Error),
}

/// Reasons a single inbound frame is dropped.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Payload is not the expected JSON shape.
    #[error("failed to decode frame: {0}")]
    Decode(#[from] serde_json::Error),

    /// A decimal price field did not parse.
    #[error("invalid decimal in field {field}: {value:?}")]
    InvalidDecimal {
        /// Wire field name.
        field: &'static str,
        /// Raw value.
        value: String,
    },

    /// A float field did not parse.
    #[error("invalid float in field {field}: {value:?}")]
    InvalidFloat {
        /// Wire field name.
        field: &'static str,
        /// Raw value.
        value: String,
    },

    /// Event time outside the representable range.
    #[error("invalid event time: {0}")]
    InvalidTimestamp(i64),

    /// Symbol not in the configured trading pairs.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Binary frame that is not UTF-8.
    #[error("binary frame is not valid UTF-8")]
    NotUtf8,
}

impl FrameError {
    /// Metric label for this drop.
    #[must_use]
    pub const fn drop_reason(&self) -> DropReason {
        match self {
            Self::Decode(_) | Self::NotUtf8 => DropReason::Decode,
            Self::InvalidDecimal { .. } | Self::InvalidFloat { .. } | Self::InvalidTimestamp(_) => {
                DropReason::Parse
            }
            Self::UnknownSymbol(_) => DropReason::UnknownSymbol,
        }
    }
}
