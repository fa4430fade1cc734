//! Canonical Market Model
//!
//! Exchange-independent representation of a ticker snapshot. Every
//! ingestor lifts its vendor frames into [`Market`], and every reader
//! (store, use-cases, RPC) speaks only this type.
//!
//! # Design
//!
//! - Prices are [`Decimal`] and never pass through binary floating point.
//! - Volume is `f64` because exchanges publish it as a float.
//! - [`Exchange::ALL`] is an ordered sequence: fan-out reads return
//!   results in this order.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainParseError;

// =============================================================================
// Exchange
// =============================================================================

/// Exchanges the system ingests from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    /// Binance spot.
    Binance,
    /// KuCoin spot.
    Kucoin,
}

impl Exchange {
    /// Canonical enumeration order.
    pub const ALL: [Self; 2] = [Self::Binance, Self::Kucoin];

    /// Lowercase short name used in store keys and on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Binance => "binance",
            Self::Kucoin => "kucoin",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = DomainParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|exchange| exchange.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainParseError::UnknownExchange(s.to_string()))
    }
}

// =============================================================================
// Trading Pair
// =============================================================================

/// A trading pair in canonical `BASE/QUOTE` form.
///
/// The canonical form is case-sensitive and is rendered back exactly as
/// parsed. Native exchange symbols are always upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TradingPair {
    base: String,
    quote: String,
}

impl TradingPair {
    /// Create a pair from its two assets.
    #[must_use]
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    /// Base asset.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Quote asset.
    #[must_use]
    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Binance native symbol: `BASEQUOTE`, upper-case.
    #[must_use]
    pub fn binance_symbol(&self) -> String {
        format!("{}{}", self.base, self.quote).to_uppercase()
    }

    /// KuCoin native symbol: `BASE-QUOTE`, upper-case.
    #[must_use]
    pub fn kucoin_symbol(&self) -> String {
        format!("{}-{}", self.base, self.quote).to_uppercase()
    }

    /// Native symbol for the given exchange.
    #[must_use]
    pub fn native_symbol(&self, exchange: Exchange) -> String {
        match exchange {
            Exchange::Binance => self.binance_symbol(),
            Exchange::Kucoin => self.kucoin_symbol(),
        }
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for TradingPair {
    type Err = DomainParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainParseError::InvalidTradingPair(s.to_string());
        let (base, quote) = s.split_once('/').ok_or_else(invalid)?;
        if base.is_empty() || quote.is_empty() || quote.contains('/') {
            return Err(invalid());
        }
        Ok(Self::new(base, quote))
    }
}

// =============================================================================
// Market
// =============================================================================

/// Latest ticker snapshot of one trading pair on one exchange.
///
/// Serializes with PascalCase keys, decimal strings for prices and an
/// RFC 3339 timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Market {
    /// Canonical `BASE/QUOTE` pair.
    pub trading_pair: String,
    /// Origin venue.
    pub exchange: Exchange,
    /// Top-of-book bid.
    pub best_buy_price: Decimal,
    /// Top-of-book ask.
    pub best_sell_price: Decimal,
    /// Most recent trade price.
    pub last_traded_price: Decimal,
    /// Exchange-supplied event time.
    pub timestamp: DateTime<Utc>,
    /// Rolling 24h traded notional in the quote asset.
    pub volume_24hr: f64,
}

/// Convert exchange event time in Unix milliseconds.
///
/// Returns `None` when the value is outside the representable range.
#[must_use]
pub fn timestamp_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use test_case::test_case;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn btc_usdt() -> Market {
        Market {
            trading_pair: "BTC/USDT".to_string(),
            exchange: Exchange::Binance,
            best_buy_price: dec("34999.00"),
            best_sell_price: dec("35001.00"),
            last_traded_price: dec("35000.50"),
            timestamp: timestamp_from_millis(1_700_000_000_000).unwrap(),
            volume_24hr: 1_234_567.89,
        }
    }

    #[test]
    fn exchange_order_is_binance_then_kucoin() {
        assert_eq!(Exchange::ALL, [Exchange::Binance, Exchange::Kucoin]);
    }

    #[test]
    fn exchange_renders_lowercase() {
        assert_eq!(Exchange::Binance.to_string(), "binance");
        assert_eq!(Exchange::Kucoin.to_string(), "kucoin");
    }

    #[test_case("binance", Exchange::Binance ; "lowercase")]
    #[test_case("KuCoin", Exchange::Kucoin ; "mixed case")]
    #[test_case(" kucoin ", Exchange::Kucoin ; "padded")]
    fn exchange_parses(input: &str, expected: Exchange) {
        assert_eq!(Exchange::from_str(input).unwrap(), expected);
    }

    #[test]
    fn unknown_exchange_is_rejected() {
        let err = Exchange::from_str("kraken").unwrap_err();
        assert_eq!(err, DomainParseError::UnknownExchange("kraken".to_string()));
    }

    #[test]
    fn pair_maps_to_native_symbols() {
        let pair = TradingPair::from_str("BTC/USDT").unwrap();
        assert_eq!(pair.binance_symbol(), "BTCUSDT");
        assert_eq!(pair.kucoin_symbol(), "BTC-USDT");
        assert_eq!(pair.native_symbol(Exchange::Kucoin), "BTC-USDT");
        assert_eq!(pair.to_string(), "BTC/USDT");
    }

    #[test]
    fn lowercase_pair_keeps_canonical_case_but_uppercases_symbols() {
        let pair = TradingPair::from_str("eth/btc").unwrap();
        assert_eq!(pair.to_string(), "eth/btc");
        assert_eq!(pair.binance_symbol(), "ETHBTC");
    }

    #[test_case("BTCUSDT" ; "no separator")]
    #[test_case("/USDT" ; "empty base")]
    #[test_case("BTC/" ; "empty quote")]
    #[test_case("BTC/USDT/X" ; "too many parts")]
    fn malformed_pairs_are_rejected(input: &str) {
        assert!(matches!(
            TradingPair::from_str(input),
            Err(DomainParseError::InvalidTradingPair(_))
        ));
    }

    #[test]
    fn market_json_uses_pascal_case_and_decimal_strings() {
        let value = serde_json::to_value(btc_usdt()).unwrap();
        assert_eq!(value["TradingPair"], "BTC/USDT");
        assert_eq!(value["Exchange"], "binance");
        assert_eq!(value["LastTradedPrice"], "35000.50");
        assert_eq!(value["Timestamp"], "2023-11-14T22:13:20Z");
        assert_eq!(value["Volume24hr"], 1_234_567.89);
    }

    #[test]
    fn market_decodes_offset_timestamps_and_numeric_prices() {
        let json = r#"{
            "TradingPair": "BTC/USDT",
            "Exchange": "binance",
            "BestBuyPrice": "34999",
            "BestSellPrice": 35001,
            "LastTradedPrice": "35000.5",
            "Timestamp": "2023-11-15T00:13:20+02:00",
            "Volume24hr": 1234567.89
        }"#;
        let decoded: Market = serde_json::from_str(json).unwrap();
        assert_eq!(decoded, btc_usdt());
    }
}
