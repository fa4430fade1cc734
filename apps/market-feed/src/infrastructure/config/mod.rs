//! Configuration Module
//!
//! Environment-driven settings for the three binaries, plus the
//! trading-pair YAML file read by the ingestors.

mod env;
mod settings;
mod trading_pairs;

pub use env::{EnvSource, load_dotenv, parse_duration};
pub use settings::{
    BinanceSettings, BinanceUpdaterConfig, ConfigError, HttpSettings, KucoinSettings,
    KucoinUpdaterConfig, MarketServerConfig, ReconnectSettings, ServerSettings, StoreBackend,
    StoreSettings, redis_url,
};
pub use trading_pairs::{TradingPairsConfig, load_trading_pairs};
