//! Binance Session
//!
//! Bootstrap: create a listen key, start its keep-alive, dial
//! `<websocket_url><listen_key>` and subscribe to every pair's ticker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use super::messages::{SubscribeRequest, parse_ticker};
use super::rest::BinanceRestClient;
use crate::application::ports::MarketUpdater;
use crate::domain::market::{Exchange, TradingPair};
use crate::infrastructure::config::BinanceSettings;
use crate::infrastructure::exchange::connection::WsConnection;
use crate::infrastructure::exchange::error::BootstrapError;
use crate::infrastructure::exchange::keepalive::KeepAlive;
use crate::infrastructure::exchange::session::{ExchangeSession, publish, report_dropped};
use crate::infrastructure::exchange::symbols::SymbolMap;

/// Binance ticker session.
pub struct BinanceSession {
    rest: BinanceRestClient,
    websocket_url: String,
    keepalive_interval: Duration,
    symbols: SymbolMap,
    updater: Arc<dyn MarketUpdater>,
}

impl BinanceSession {
    /// Create a session for `pairs`.
    pub fn new(
        settings: &BinanceSettings,
        http: Client,
        pairs: &[TradingPair],
        updater: Arc<dyn MarketUpdater>,
    ) -> Self {
        Self {
            rest: BinanceRestClient::new(http, &settings.hostname, settings.api_key()),
            websocket_url: settings.websocket_url.clone(),
            keepalive_interval: settings.keepalive_interval,
            symbols: SymbolMap::new(Exchange::Binance, pairs),
            updater,
        }
    }
}

#[async_trait]
impl ExchangeSession for BinanceSession {
    fn exchange(&self) -> Exchange {
        Exchange::Binance
    }

    async fn bootstrap(&self, session: &CancellationToken) -> Result<WsConnection, BootstrapError> {
        let listen_key = self.rest.create_listen_key().await?;
        tracing::debug!("Listen key created");

        let rest = self.rest.clone();
        let key = listen_key.clone();
        KeepAlive {
            exchange: Exchange::Binance,
            name: "listen-key refresh",
            period: self.keepalive_interval,
        }
        .spawn(session.clone(), move || {
            let rest = rest.clone();
            let key = key.clone();
            async move { rest.keep_alive(&key).await }
        });

        let url = format!("{}{listen_key}", self.websocket_url);
        let connection = WsConnection::dial(&url)
            .await
            .map_err(BootstrapError::Dial)?;

        let request = SubscribeRequest::tickers(&self.symbols);
        connection
            .sender()
            .send_json(&request)
            .await
            .map_err(BootstrapError::Subscribe)?;

        tracing::info!(streams = request.params.len(), "Subscribed to ticker streams");
        Ok(connection)
    }

    async fn handle_text(&self, text: &str) {
        match parse_ticker(text, &self.symbols) {
            Ok(Some(market)) => publish(self.updater.as_ref(), market).await,
            Ok(None) => tracing::trace!(exchange = %Exchange::Binance, "Non-ticker frame skipped"),
            Err(e) => report_dropped(Exchange::Binance, &e, text),
        }
    }
}
