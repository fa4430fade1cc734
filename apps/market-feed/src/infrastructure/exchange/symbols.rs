//! Symbol Translation
//!
//! Bidirectional lookup between canonical `BASE/QUOTE` pairs and one
//! exchange's native symbols.

use std::collections::HashMap;

use crate::domain::market::{Exchange, TradingPair};

/// Canonical pair <-> native symbol map for one exchange.
#[derive(Debug, Clone)]
pub struct SymbolMap {
    exchange: Exchange,
    entries: Vec<(String, String)>,
    by_native: HashMap<String, usize>,
}

impl SymbolMap {
    /// Build the map for `exchange` from configured pairs, keeping their order.
    #[must_use]
    pub fn new(exchange: Exchange, pairs: &[TradingPair]) -> Self {
        let mut entries = Vec::with_capacity(pairs.len());
        let mut by_native = HashMap::with_capacity(pairs.len());

        for pair in pairs {
            let native = pair.native_symbol(exchange);
            if by_native.contains_key(&native) {
                continue;
            }
            by_native.insert(native.clone(), entries.len());
            entries.push((pair.to_string(), native));
        }

        Self {
            exchange,
            entries,
            by_native,
        }
    }

    /// Exchange this map translates for.
    #[must_use]
    pub const fn exchange(&self) -> Exchange {
        self.exchange
    }

    /// Canonical pair for a native symbol.
    #[must_use]
    pub fn canonical(&self, native: &str) -> Option<&str> {
        self.by_native
            .get(native)
            .map(|&idx| self.entries[idx].0.as_str())
    }

    /// Native symbol for a canonical pair.
    #[must_use]
    pub fn native(&self, canonical: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(pair, _)| pair == canonical)
            .map(|(_, native)| native.as_str())
    }

    /// Native symbols in configuration order.
    pub fn native_symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, native)| native.as_str())
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no pairs are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn pairs(list: &[&str]) -> Vec<TradingPair> {
        list.iter()
            .map(|p| TradingPair::from_str(p).unwrap())
            .collect()
    }

    #[test]
    fn binance_round_trip() {
        let map = SymbolMap::new(Exchange::Binance, &pairs(&["BTC/USDT", "ETH/BTC"]));

        assert_eq!(map.canonical("BTCUSDT"), Some("BTC/USDT"));
        assert_eq!(map.native("BTC/USDT"), Some("BTCUSDT"));
        assert_eq!(map.native_symbols().collect::<Vec<_>>(), vec!["BTCUSDT", "ETHBTC"]);
    }

    #[test]
    fn kucoin_round_trip() {
        let map = SymbolMap::new(Exchange::Kucoin, &pairs(&["BTC/USDT"]));

        assert_eq!(map.canonical("BTC-USDT"), Some("BTC/USDT"));
        assert_eq!(map.native("BTC/USDT"), Some("BTC-USDT"));
    }

    #[test]
    fn unknown_symbols_miss() {
        let map = SymbolMap::new(Exchange::Binance, &pairs(&["BTC/USDT"]));

        assert_eq!(map.canonical("ETHUSDT"), None);
        assert_eq!(map.canonical("btcusdt"), None);
        assert_eq!(map.native("ETH/USDT"), None);
    }

    #[test]
    fn colliding_native_symbols_keep_first_pair() {
        let map = SymbolMap::new(Exchange::Binance, &pairs(&["BTC/USDT", "btc/usdt"]));

        assert_eq!(map.len(), 1);
        assert_eq!(map.canonical("BTCUSDT"), Some("BTC/USDT"));
    }
}
