//! KuCoin Wire Messages
//!
//! Outbound ping and subscribe frames, and the `/market/snapshot`
//! envelope. The envelope's `data` is only decoded once the topic is
//! known to be a snapshot, so welcome, ack and pong messages pass through
//! without errors.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::market::{Exchange, Market, timestamp_from_millis};
use crate::infrastructure::exchange::error::FrameError;
use crate::infrastructure::exchange::symbols::SymbolMap;

/// Topic prefix of market snapshot pushes.
pub const SNAPSHOT_TOPIC_PREFIX: &str = "/market/snapshot:";

/// Application-level ping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PingMessage {
    /// Unique frame id.
    pub id: String,
    /// Always `ping`.
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl PingMessage {
    /// Ping with `id`.
    #[must_use]
    pub const fn new(id: String) -> Self {
        Self { id, kind: "ping" }
    }
}

/// Topic subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeMessage {
    /// Unique frame id.
    pub id: String,
    /// Always `subscribe`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Topic to subscribe to.
    pub topic: String,
    /// Public channel.
    pub private_channel: bool,
    /// Whether the server should ack.
    pub response: bool,
}

impl SubscribeMessage {
    /// Snapshot subscription for one native symbol.
    #[must_use]
    pub fn snapshot(id: String, symbol: &str) -> Self {
        Self {
            id,
            kind: "subscribe",
            topic: format!("{SNAPSHOT_TOPIC_PREFIX}{symbol}"),
            private_channel: false,
            response: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    topic: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SnapshotData {
    data: Snapshot,
}

/// Market snapshot fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Best bid.
    pub buy: f64,
    /// Best ask.
    pub sell: f64,
    /// Last trade price.
    pub last_traded_price: f64,
    /// Snapshot time, Unix milliseconds.
    pub datetime: i64,
    /// 24h traded value in the quote asset.
    pub vol_value: f64,
}

/// Decode a frame into a [`Market`].
///
/// Returns `Ok(None)` for control messages and non-snapshot topics.
///
/// # Errors
///
/// Returns a [`FrameError`] when the frame is malformed, a price cannot be
/// represented as a decimal, or the symbol is not configured.
pub fn parse_snapshot(text: &str, symbols: &SymbolMap) -> Result<Option<Market>, FrameError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    let Some(symbol) = envelope.topic.strip_prefix(SNAPSHOT_TOPIC_PREFIX) else {
        return Ok(None);
    };

    let SnapshotData { data: snapshot } = serde_json::from_value(envelope.data)?;

    let best_buy_price = decimal_from_f64("buy", snapshot.buy)?;
    let best_sell_price = decimal_from_f64("sell", snapshot.sell)?;
    let last_traded_price = decimal_from_f64("lastTradedPrice", snapshot.last_traded_price)?;

    let trading_pair = symbols
        .canonical(symbol)
        .ok_or_else(|| FrameError::UnknownSymbol(symbol.to_string()))?;
    let timestamp = timestamp_from_millis(snapshot.datetime)
        .ok_or(FrameError::InvalidTimestamp(snapshot.datetime))?;

    Ok(Some(Market {
        trading_pair: trading_pair.to_string(),
        exchange: Exchange::Kucoin,
        best_buy_price,
        best_sell_price,
        last_traded_price,
        timestamp,
        volume_24hr: snapshot.vol_value,
    }))
}

/// Convert through the float's shortest round-trip rendering, so `0.1`
/// becomes exactly `0.1` rather than its binary expansion.
///
/// # Errors
///
/// Returns [`FrameError::InvalidFloat`] for non-finite values and
/// [`FrameError::InvalidDecimal`] when the value exceeds decimal range.
pub fn decimal_from_f64(field: &'static str, value: f64) -> Result<Decimal, FrameError> {
    if !value.is_finite() {
        return Err(FrameError::InvalidFloat {
            field,
            value: value.to_string(),
        });
    }
    let rendered = value.to_string();
    Decimal::from_str(&rendered).map_err(|_| FrameError::InvalidDecimal {
        field,
        value: rendered,
    })
}
