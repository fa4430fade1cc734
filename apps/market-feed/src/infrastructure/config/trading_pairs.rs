//! Trading-Pair Configuration
//!
//! YAML file listing the canonical pairs each ingestor subscribes to:
//!
//! ```yaml
//! exchanges:
//!   - name: binance
//!     pairs: [BTC/USDT, ETH/USDT]
//!   - name: kucoin
//!     pairs: [BTC/USDT]
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use super::settings::ConfigError;
use crate::domain::market::{Exchange, TradingPair};

#[derive(Debug, Deserialize)]
struct RawTradingPairs {
    #[serde(default)]
    exchanges: Vec<RawExchangePairs>,
}

#[derive(Debug, Deserialize)]
struct RawExchangePairs {
    name: String,
    #[serde(default)]
    pairs: Vec<String>,
}

/// Validated trading pairs per exchange, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradingPairsConfig {
    pairs: HashMap<Exchange, Vec<TradingPair>>,
}

impl TradingPairsConfig {
    /// Parse and validate YAML content.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed YAML, unknown exchange names or
    /// pairs not in `BASE/QUOTE` form.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let raw: RawTradingPairs = serde_yaml_bw::from_str(content)?;
        let mut pairs: HashMap<Exchange, Vec<TradingPair>> = HashMap::new();

        for entry in raw.exchanges {
            let exchange = Exchange::from_str(&entry.name)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
            let list = pairs.entry(exchange).or_default();
            for pair in entry.pairs {
                let pair = TradingPair::from_str(pair.trim())
                    .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
                if !list.contains(&pair) {
                    list.push(pair);
                }
            }
        }

        Ok(Self { pairs })
    }

    /// Pairs configured for `exchange` (empty if none).
    #[must_use]
    pub fn pairs_for(&self, exchange: Exchange) -> &[TradingPair] {
        self.pairs.get(&exchange).map(Vec::as_slice).unwrap_or_default()
    }

    /// Pairs for `exchange`, requiring at least one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if none are configured.
    pub fn require(&self, exchange: Exchange) -> Result<Vec<TradingPair>, ConfigError> {
        let pairs = self.pairs_for(exchange);
        if pairs.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "no trading pairs configured for {exchange}"
            )));
        }
        Ok(pairs.to_vec())
    }
}

/// Load the trading-pair file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::ReadError`] if the file cannot be read, or any
/// error from [`TradingPairsConfig::from_yaml`].
pub fn load_trading_pairs(path: &Path) -> Result<TradingPairsConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    TradingPairsConfig::from_yaml(&content)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r"
exchanges:
  - name: binance
    pairs:
      - BTC/USDT
      - ETH/USDT
  - name: kucoin
    pairs:
      - BTC/USDT
";

    #[test]
    fn parses_pairs_per_exchange_in_order() {
        let config = TradingPairsConfig::from_yaml(SAMPLE).unwrap();

        let binance: Vec<_> = config
            .pairs_for(Exchange::Binance)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(binance, vec!["BTC/USDT", "ETH/USDT"]);
        assert_eq!(config.pairs_for(Exchange::Kucoin).len(), 1);
    }

    #[test]
    fn duplicate_pairs_collapse() {
        let yaml = "exchanges:\n  - name: kucoin\n    pairs: [BTC/USDT, BTC/USDT]\n";
        let config = TradingPairsConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.pairs_for(Exchange::Kucoin).len(), 1);
    }

    #[test]
    fn unknown_exchange_is_rejected() {
        let yaml = "exchanges:\n  - name: kraken\n    pairs: [BTC/USD]\n";
        let err = TradingPairsConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(msg) if msg.contains("kraken")));
    }

    #[test]
    fn malformed_pair_is_rejected() {
        let yaml = "exchanges:\n  - name: binance\n    pairs: [BTCUSDT]\n";
        assert!(matches!(
            TradingPairsConfig::from_yaml(yaml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn require_fails_for_unconfigured_exchange() {
        let yaml = "exchanges:\n  - name: binance\n    pairs: [BTC/USDT]\n";
        let config = TradingPairsConfig::from_yaml(yaml).unwrap();
        assert!(config.require(Exchange::Binance).is_ok());
        assert!(config.require(Exchange::Kucoin).is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = load_trading_pairs(file.path()).unwrap();
        assert_eq!(config.pairs_for(Exchange::Binance).len(), 2);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_trading_pairs(Path::new("/nonexistent/trading_pairs.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
