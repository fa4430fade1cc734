//! KuCoin Session
//!
//! Bootstrap: request a public bullet token, dial the first instance
//! server, start the ping task and subscribe to each pair's snapshot
//! topic.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use super::messages::{PingMessage, SubscribeMessage, parse_snapshot};
use super::rest::KucoinRestClient;
use crate::application::ports::{Clock, MarketUpdater, SystemClock};
use crate::domain::market::{Exchange, TradingPair};
use crate::infrastructure::config::KucoinSettings;
use crate::infrastructure::exchange::connection::WsConnection;
use crate::infrastructure::exchange::error::BootstrapError;
use crate::infrastructure::exchange::keepalive::KeepAlive;
use crate::infrastructure::exchange::session::{ExchangeSession, publish, report_dropped};
use crate::infrastructure::exchange::symbols::SymbolMap;

const PING_LEAD: Duration = Duration::from_millis(500);
const MIN_PING_PERIOD: Duration = Duration::from_millis(100);

/// Ping period for a server-reported `pingInterval` in milliseconds.
#[must_use]
pub fn ping_period(ping_interval_ms: u64) -> Duration {
    Duration::from_millis(ping_interval_ms)
        .saturating_sub(PING_LEAD)
        .max(MIN_PING_PERIOD)
}

/// Frame ids from clock nanoseconds, strictly increasing.
pub struct FrameIds {
    clock: Arc<dyn Clock>,
    last: AtomicI64,
}

impl FrameIds {
    /// Ids drawn from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last: AtomicI64::new(i64::MIN),
        }
    }

    /// Next id: the clock's nanoseconds, bumped past the previous id.
    pub fn next_id(&self) -> String {
        let now = self.clock.now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        let bump = |last: i64| now.max(last.saturating_add(1));
        let (Ok(previous) | Err(previous)) = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| Some(bump(last)));
        bump(previous).to_string()
    }
}

/// KuCoin snapshot session.
pub struct KucoinSession {
    rest: KucoinRestClient,
    symbols: SymbolMap,
    updater: Arc<dyn MarketUpdater>,
    ids: Arc<FrameIds>,
}

impl KucoinSession {
    /// Create a session for `pairs`.
    pub fn new(
        settings: &KucoinSettings,
        http: Client,
        pairs: &[TradingPair],
        updater: Arc<dyn MarketUpdater>,
    ) -> Self {
        Self {
            rest: KucoinRestClient::new(http, &settings.hostname),
            symbols: SymbolMap::new(Exchange::Kucoin, pairs),
            updater,
            ids: Arc::new(FrameIds::new(Arc::new(SystemClock))),
        }
    }

    /// Draw frame ids from `clock` instead of the system clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.ids = Arc::new(FrameIds::new(clock));
        self
    }
}

#[async_trait]
impl ExchangeSession for KucoinSession {
    fn exchange(&self) -> Exchange {
        Exchange::Kucoin
    }

    async fn bootstrap(&self, session: &CancellationToken) -> Result<WsConnection, BootstrapError> {
        let bullet = self.rest.bullet_public().await?;
        let server = bullet
            .instance_servers
            .into_iter()
            .next()
            .ok_or(BootstrapError::NoInstanceServers)?;

        let url = format!("{}?token={}", server.endpoint, bullet.token);
        let connection = WsConnection::dial(&url)
            .await
            .map_err(BootstrapError::Dial)?;

        let period = ping_period(server.ping_interval);
        tracing::debug!(
            endpoint = %server.endpoint,
            ping_interval_ms = server.ping_interval,
            "Connected to instance server"
        );

        let sender = connection.sender();
        let ids = Arc::clone(&self.ids);
        KeepAlive {
            exchange: Exchange::Kucoin,
            name: "ping",
            period,
        }
        .spawn(session.clone(), move || {
            let sender = sender.clone();
            let ping = PingMessage::new(ids.next_id());
            async move { sender.send_json(&ping).await }
        });

        let sender = connection.sender();
        for symbol in self.symbols.native_symbols() {
            let subscribe = SubscribeMessage::snapshot(self.ids.next_id(), symbol);
            sender
                .send_json(&subscribe)
                .await
                .map_err(BootstrapError::Subscribe)?;
        }

        tracing::info!(topics = self.symbols.len(), "Subscribed to snapshot topics");
        Ok(connection)
    }

    async fn handle_text(&self, text: &str) {
        match parse_snapshot(text, &self.symbols) {
            Ok(Some(market)) => publish(self.updater.as_ref(), market).await,
            Ok(None) => tracing::trace!(exchange = %Exchange::Kucoin, "Control frame skipped"),
            Err(e) => report_dropped(Exchange::Kucoin, &e, text),
        }
    }
}
