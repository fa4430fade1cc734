//! Shared fixtures for ingestion tests: a local WebSocket server that hands
//! each accepted connection to the test, and an updater that records
//! published markets.

#![allow(dead_code)]

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

use market_feed::infrastructure::exchange::BackoffConfig;
use market_feed::{Market, MarketError, MarketUpdater};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// One accepted WebSocket connection and the request target it dialed.
pub struct Accepted {
    pub target: String,
    pub ws: WebSocketStream<TcpStream>,
}

impl Accepted {
    /// Next text frame from the client, skipping control frames.
    pub async fn next_text(&mut self) -> String {
        loop {
            let message = tokio::time::timeout(TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for client frame")
                .expect("client closed the connection")
                .expect("websocket error");
            if let Message::Text(text) = message {
                return text.as_str().to_owned();
            }
        }
    }
}

/// Local WebSocket server.
pub struct WsServer {
    pub url: String,
    accepted: mpsc::UnboundedReceiver<Accepted>,
}

impl WsServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let (tx, accepted) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let mut target = String::new();
                let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                    target = request.uri().to_string();
                    Ok(response)
                };
                let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                    continue;
                };
                if tx.send(Accepted { target, ws }).is_err() {
                    break;
                }
            }
        });

        Self { url, accepted }
    }

    /// Wait for the next client connection.
    pub async fn accept(&mut self) -> Accepted {
        tokio::time::timeout(TIMEOUT, self.accepted.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("server stopped")
    }

    /// Assert that no client connects within `wait`.
    pub async fn assert_no_connection(&mut self, wait: Duration) {
        let next = tokio::time::timeout(wait, self.accepted.recv()).await;
        assert!(!matches!(next, Ok(Some(_))), "unexpected reconnect");
    }
}

/// Updater that forwards every published market to the test.
pub struct RecordingUpdater {
    tx: mpsc::UnboundedSender<Market>,
}

impl RecordingUpdater {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Market>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl MarketUpdater for RecordingUpdater {
    async fn update_market(&self, market: Market) -> Result<(), MarketError> {
        let _ = self.tx.send(market);
        Ok(())
    }
}

pub async fn next_market(rx: &mut mpsc::UnboundedReceiver<Market>) -> Market {
    tokio::time::timeout(TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a market update")
        .expect("updater dropped")
}

pub fn fast_backoff() -> BackoffConfig {
    BackoffConfig {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        multiplier: 2.0,
        jitter_factor: 0.0,
    }
}
