//! Binance Wire Messages
//!
//! Only the `24hrTicker` fields the canonical model needs are decoded;
//! everything else in the payload is ignored. Frames that are not ticker
//! events (subscription acks, account events) decode with an empty event
//! type and are skipped.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::market::{Exchange, Market, timestamp_from_millis};
use crate::infrastructure::exchange::error::FrameError;
use crate::infrastructure::exchange::symbols::SymbolMap;

/// Event type of the rolling 24h ticker stream.
pub const TICKER_EVENT: &str = "24hrTicker";

/// Subscribe request for `<symbol>@ticker` streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscribeRequest {
    /// Always `SUBSCRIBE`.
    pub method: &'static str,
    /// Stream names.
    pub params: Vec<String>,
    /// Request id echoed in the ack.
    pub id: u64,
}

impl SubscribeRequest {
    /// Ticker subscriptions for every symbol in `symbols`.
    #[must_use]
    pub fn tickers(symbols: &SymbolMap) -> Self {
        Self {
            method: "SUBSCRIBE",
            params: symbols
                .native_symbols()
                .map(|symbol| format!("{}@ticker", symbol.to_lowercase()))
                .collect(),
            id: 1,
        }
    }
}

/// Rolling 24h ticker event.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TickerEvent {
    /// Event type.
    #[serde(rename = "e")]
    pub event_type: String,
    /// Event time, Unix milliseconds.
    #[serde(rename = "E")]
    pub event_time: i64,
    /// Native symbol.
    #[serde(rename = "s")]
    pub symbol: String,
    /// Last price.
    #[serde(rename = "c")]
    pub last_price: String,
    /// Best bid price.
    #[serde(rename = "b")]
    pub best_bid: String,
    /// Best ask price.
    #[serde(rename = "a")]
    pub best_ask: String,
    /// Total traded quote asset volume.
    #[serde(rename = "q")]
    pub quote_volume: String,
}

/// Decode a frame into a [`Market`].
///
/// Returns `Ok(None)` for frames that are not ticker events.
///
/// # Errors
///
/// Returns a [`FrameError`] when the frame is malformed, a numeric field
/// does not parse, or the symbol is not configured.
pub fn parse_ticker(text: &str, symbols: &SymbolMap) -> Result<Option<Market>, FrameError> {
    let event: TickerEvent = serde_json::from_str(text)?;
    if event.event_type != TICKER_EVENT {
        return Ok(None);
    }

    let last_traded_price = decimal("c", &event.last_price)?;
    let best_buy_price = decimal("b", &event.best_bid)?;
    let best_sell_price = decimal("a", &event.best_ask)?;
    let volume_24hr = float("q", &event.quote_volume)?;

    let trading_pair = symbols
        .canonical(&event.symbol)
        .ok_or_else(|| FrameError::UnknownSymbol(event.symbol.clone()))?;
    let timestamp = timestamp_from_millis(event.event_time)
        .ok_or(FrameError::InvalidTimestamp(event.event_time))?;

    Ok(Some(Market {
        trading_pair: trading_pair.to_string(),
        exchange: Exchange::Binance,
        best_buy_price,
        best_sell_price,
        last_traded_price,
        timestamp,
        volume_24hr,
    }))
}

fn decimal(field: &'static str, value: &str) -> Result<Decimal, FrameError> {
    Decimal::from_str(value).map_err(|_| FrameError::InvalidDecimal {
        field,
        value: value.to_string(),
    })
}

fn float(field: &'static str, value: &str) -> Result<f64, FrameError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FrameError::InvalidFloat {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use test_case::test_case;

    use super::*;
    use crate::domain::market::TradingPair;
    use crate::infrastructure::metrics::DropReason;

    const BTC_TICKER: &str = r#"{"e":"24hrTicker","E":1700000000000,"s":"BTCUSDT","c":"35000.50","b":"34999.00","a":"35001.00","q":"1234567.89"}"#;

    fn symbols() -> SymbolMap {
        SymbolMap::new(
            Exchange::Binance,
            &[TradingPair::new("BTC", "USDT"), TradingPair::new("ETH", "BTC")],
        )
    }

    #[test]
    fn subscribe_request_wire_format() {
        let request = SubscribeRequest::tickers(&symbols());
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"method":"SUBSCRIBE","params":["btcusdt@ticker","ethbtc@ticker"],"id":1}"#
        );
    }

    #[test]
    fn parses_ticker_event() {
        let market = parse_ticker(BTC_TICKER, &symbols()).unwrap().unwrap();

        assert_eq!(market.trading_pair, "BTC/USDT");
        assert_eq!(market.exchange, Exchange::Binance);
        assert_eq!(market.last_traded_price, Decimal::from_str("35000.50").unwrap());
        assert_eq!(market.best_buy_price, Decimal::from_str("34999").unwrap());
        assert_eq!(market.best_sell_price, Decimal::from_str("35001").unwrap());
        assert_eq!(market.timestamp, Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap());
        assert!((market.volume_24hr - 1_234_567.89).abs() < f64::EPSILON);
    }

    #[test]
    fn ignores_unrelated_fields() {
        let text = r#"{"e":"24hrTicker","E":1700000000000,"s":"ETHBTC","p":"0.1","P":"1.2","c":"0.05","C":1,"b":"0.049","B":"3","a":"0.051","A":"4","q":"12.5","Q":"0.2"}"#;
        let market = parse_ticker(text, &symbols()).unwrap().unwrap();
        assert_eq!(market.trading_pair, "ETH/BTC");
        assert_eq!(market.best_sell_price, Decimal::from_str("0.051").unwrap());
    }

    #[test_case(r#"{"result":null,"id":1}"# ; "subscription ack")]
    #[test_case(r#"{"e":"outboundAccountPosition","E":1700000000000}"# ; "account event")]
    #[test_case("{}" ; "empty object")]
    fn skips_non_ticker_frames(text: &str) {
        assert!(parse_ticker(text, &symbols()).unwrap().is_none());
    }

    #[test_case("not json", DropReason::Decode ; "garbage")]
    #[test_case(r#"{"e":"24hrTicker","E":"soon"}"#, DropReason::Decode ; "wrong field type")]
    #[test_case(r#"{"e":"24hrTicker","E":1700000000000,"s":"BTCUSDT","c":"abc","b":"1","a":"1","q":"1"}"#, DropReason::Parse ; "bad last price")]
    #[test_case(r#"{"e":"24hrTicker","E":1700000000000,"s":"BTCUSDT","c":"1","b":"1","a":"","q":"1"}"#, DropReason::Parse ; "empty ask")]
    #[test_case(r#"{"e":"24hrTicker","E":1700000000000,"s":"BTCUSDT","c":"1","b":"1","a":"1","q":"NaN"}"#, DropReason::Parse ; "non finite volume")]
    #[test_case(r#"{"e":"24hrTicker","E":1700000000000,"s":"DOGEUSDT","c":"1","b":"1","a":"1","q":"1"}"#, DropReason::UnknownSymbol ; "unconfigured symbol")]
    fn rejects_bad_frames(text: &str, reason: DropReason) {
        let err = parse_ticker(text, &symbols()).unwrap_err();
        assert_eq!(err.drop_reason(), reason);
    }
}
