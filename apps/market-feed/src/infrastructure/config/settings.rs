//! Service Configuration Settings
//!
//! Configuration types for the ingestors and the query server, loaded
//! from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::env::EnvSource;
use crate::infrastructure::store::DEFAULT_MARKET_TTL;

/// Listen keys expire after 60 minutes without a keep-alive.
const MAX_BINANCE_KEEPALIVE: Duration = Duration::from_secs(60 * 60);

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Environment variable is set but empty.
    #[error("Environment variable {0} is empty")]
    EmptyValue(String),

    /// Environment variable could not be parsed.
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Failed to read a configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Shared Settings
// =============================================================================

/// Which [`MarketStore`](crate::application::ports::MarketStore) backend to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Redis at `redis://host:port/`.
    Redis {
        /// Redis host.
        host: String,
        /// Redis port.
        port: u16,
    },
    /// Process-local store; state is lost on exit.
    Memory,
}

/// Store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// Backend selection.
    pub backend: StoreBackend,
    /// Retention of each market record.
    pub market_ttl: Duration,
}

impl StoreSettings {
    fn from_source(env: &EnvSource<'_>) -> Result<Self, ConfigError> {
        let backend = match env.string_or("STORE_BACKEND", "redis").to_lowercase().as_str() {
            "redis" => StoreBackend::Redis {
                host: env.required("REDIS_HOST")?,
                port: env.parse_or("REDIS_PORT", 6379)?,
            },
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::invalid(
                    "STORE_BACKEND",
                    other,
                    "expected redis or memory",
                ));
            }
        };

        let market_ttl = env.secs_or("MARKET_TTL_SECS", DEFAULT_MARKET_TTL)?;
        if market_ttl.is_zero() {
            return Err(ConfigError::invalid("MARKET_TTL_SECS", "0", "must be positive"));
        }

        Ok(Self {
            backend,
            market_ttl,
        })
    }

}

/// Redis connection URL for `host:port`.
#[must_use]
pub fn redis_url(host: &str, port: u16) -> String {
    format!("redis://{host}:{port}/")
}

/// HTTP client settings for bootstrap and keep-alive requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Total request timeout.
    pub timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

/// Backoff between ingestor sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectSettings {
    /// Initial reconnection delay.
    pub delay_initial: Duration,
    /// Maximum reconnection delay.
    pub delay_max: Duration,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            delay_initial: Duration::from_millis(250),
            delay_max: Duration::from_secs(30),
        }
    }
}

impl ReconnectSettings {
    fn from_source(env: &EnvSource<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            delay_initial: env.millis_or("RECONNECT_INITIAL_DELAY_MS", defaults.delay_initial)?,
            delay_max: env.secs_or("RECONNECT_MAX_DELAY_SECS", defaults.delay_max)?,
        })
    }
}

fn health_port(env: &EnvSource<'_>) -> Result<Option<u16>, ConfigError> {
    env.parse_opt("HEALTH_PORT")
}

fn trading_pairs_path(env: &EnvSource<'_>) -> PathBuf {
    PathBuf::from(env.string_or("TRADING_PAIRS_PATH", "data/trading_pairs.yaml"))
}

fn log_level(env: &EnvSource<'_>) -> String {
    env.string_or("LOG_LEVEL", "debug")
}

// =============================================================================
// Binance
// =============================================================================

/// Binance connection settings.
#[derive(Clone)]
pub struct BinanceSettings {
    api_key: String,
    /// REST base URL, e.g. `https://api.binance.com`.
    pub hostname: String,
    /// WebSocket base URL the listen key is appended to.
    pub websocket_url: String,
    /// Listen-key keep-alive period.
    pub keepalive_interval: Duration,
}

impl BinanceSettings {
    /// Create settings with the default 20 minute keep-alive.
    #[must_use]
    pub fn new(api_key: impl Into<String>, hostname: impl Into<String>, websocket_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            hostname: hostname.into(),
            websocket_url: websocket_url.into(),
            keepalive_interval: Duration::from_secs(20 * 60),
        }
    }

    /// Get the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    fn from_source(env: &EnvSource<'_>) -> Result<Self, ConfigError> {
        let mut settings = Self::new(
            env.required("BINANCE_API_KEY")?,
            env.required("BINANCE_HOSTNAME")?,
            env.required("BINANCE_WEBSOCKET_URL")?,
        );

        let raw = env.get("BINANCE_KEEPALIVE_INTERVAL").unwrap_or_default();
        settings.keepalive_interval =
            env.duration_or("BINANCE_KEEPALIVE_INTERVAL", settings.keepalive_interval)?;
        if settings.keepalive_interval.is_zero()
            || settings.keepalive_interval > MAX_BINANCE_KEEPALIVE
        {
            return Err(ConfigError::invalid(
                "BINANCE_KEEPALIVE_INTERVAL",
                &raw,
                "must be greater than zero and at most 60m",
            ));
        }

        Ok(settings)
    }
}

impl std::fmt::Debug for BinanceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceSettings")
            .field("api_key", &"[REDACTED]")
            .field("hostname", &self.hostname)
            .field("websocket_url", &self.websocket_url)
            .field("keepalive_interval", &self.keepalive_interval)
            .finish()
    }
}

/// Complete `binance-updater` configuration.
#[derive(Debug, Clone)]
pub struct BinanceUpdaterConfig {
    /// Exchange connection settings.
    pub binance: BinanceSettings,
    /// HTTP client settings.
    pub http: HttpSettings,
    /// Store settings.
    pub store: StoreSettings,
    /// Session backoff.
    pub reconnect: ReconnectSettings,
    /// Trading-pair YAML path.
    pub trading_pairs_path: PathBuf,
    /// Health/metrics HTTP port, if enabled.
    pub health_port: Option<u16>,
    /// Log filter directive.
    pub log_level: String,
}

impl BinanceUpdaterConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&EnvSource::process())
    }

    /// Create configuration from an arbitrary source.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_source(env: &EnvSource<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            binance: BinanceSettings::from_source(env)?,
            http: HttpSettings {
                timeout: env.duration_or("HTTP_CLIENT_TIMEOUT", HttpSettings::default().timeout)?,
            },
            store: StoreSettings::from_source(env)?,
            reconnect: ReconnectSettings::from_source(env)?,
            trading_pairs_path: trading_pairs_path(env),
            health_port: health_port(env)?,
            log_level: log_level(env),
        })
    }
}

// =============================================================================
// KuCoin
// =============================================================================

/// KuCoin connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KucoinSettings {
    /// REST base URL, e.g. `https://api.kucoin.com`.
    pub hostname: String,
}

/// Complete `kucoin-updater` configuration.
#[derive(Debug, Clone)]
pub struct KucoinUpdaterConfig {
    /// Exchange connection settings.
    pub kucoin: KucoinSettings,
    /// HTTP client settings.
    pub http: HttpSettings,
    /// Store settings.
    pub store: StoreSettings,
    /// Session backoff.
    pub reconnect: ReconnectSettings,
    /// Trading-pair YAML path.
    pub trading_pairs_path: PathBuf,
    /// Health/metrics HTTP port, if enabled.
    pub health_port: Option<u16>,
    /// Log filter directive.
    pub log_level: String,
}

impl KucoinUpdaterConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&EnvSource::process())
    }

    /// Create configuration from an arbitrary source.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_source(env: &EnvSource<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            kucoin: KucoinSettings {
                hostname: env.required("KUCOIN_HOSTNAME")?,
            },
            http: HttpSettings {
                timeout: env.duration_or("HTTP_CLIENT_TIMEOUT", HttpSettings::default().timeout)?,
            },
            store: StoreSettings::from_source(env)?,
            reconnect: ReconnectSettings::from_source(env)?,
            trading_pairs_path: trading_pairs_path(env),
            health_port: health_port(env)?,
            log_level: log_level(env),
        })
    }
}

// =============================================================================
// Query Server
// =============================================================================

/// gRPC server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Time allowed for in-flight calls after shutdown starts.
    pub shutdown_grace: Duration,
}

impl ServerSettings {
    /// Resolve `host:port` to the first address it names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the host does not resolve.
    pub async fn resolve_bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let invalid = |reason: String| ConfigError::invalid("HOST", &self.host, reason);
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| invalid(e.to_string()))?
            .next()
            .ok_or_else(|| invalid("resolved to no addresses".to_string()))
    }
}

/// Complete `market-server` configuration.
#[derive(Debug, Clone)]
pub struct MarketServerConfig {
    /// gRPC server settings.
    pub server: ServerSettings,
    /// Store settings.
    pub store: StoreSettings,
    /// Health/metrics HTTP port, if enabled.
    pub health_port: Option<u16>,
    /// Log filter directive.
    pub log_level: String,
}

impl MarketServerConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&EnvSource::process())
    }

    /// Create configuration from an arbitrary source.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_source(env: &EnvSource<'_>) -> Result<Self, ConfigError> {
        let server = ServerSettings {
            host: env.required("HOST")?,
            port: env.parse_or("PORT", 9000)?,
            shutdown_grace: env.secs_or("SHUTDOWN_GRACE_SECS", Duration::from_secs(30))?,
        };

        Ok(Self {
            server,
            store: StoreSettings::from_source(env)?,
            health_port: health_port(env)?,
            log_level: log_level(env),
        })
    }
}
