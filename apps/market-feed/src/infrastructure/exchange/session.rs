//! Session Driver
//!
//! Runs the reconnecting session state machine for any exchange that
//! implements [`ExchangeSession`]. The exchange supplies bootstrap and
//! frame decoding; the driver owns cancellation, backoff and status.

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::application::ports::MarketUpdater;
use crate::domain::errors::MarketError;
use crate::domain::market::{Exchange, Market};
use crate::infrastructure::exchange::connection::WsConnection;
use crate::infrastructure::exchange::error::{BootstrapError, FrameError, IngestorError};
use crate::infrastructure::exchange::reconnect::{Backoff, BackoffConfig};
use crate::infrastructure::exchange::status::{IngestorState, IngestorStatus};
use crate::infrastructure::metrics;

/// One exchange's bootstrap and frame handling.
#[async_trait]
pub trait ExchangeSession: Send + Sync {
    /// Exchange this session ingests.
    fn exchange(&self) -> Exchange;

    /// Acquire credentials, dial and subscribe.
    ///
    /// Background tasks started here must stop when `session` is cancelled.
    ///
    /// # Errors
    ///
    /// Any failure is fatal to the ingestor.
    async fn bootstrap(&self, session: &CancellationToken) -> Result<WsConnection, BootstrapError>;

    /// Decode and publish one text payload. Failures are logged and dropped.
    async fn handle_text(&self, text: &str);
}

/// Reconnecting ingestor for one exchange.
pub struct Ingestor<S> {
    session: S,
    status: Arc<IngestorStatus>,
    backoff: BackoffConfig,
    cancel: CancellationToken,
}

impl<S: ExchangeSession> Ingestor<S> {
    /// Create an ingestor that stops when `cancel` fires.
    pub fn new(session: S, backoff: BackoffConfig, cancel: CancellationToken) -> Self {
        let status = Arc::new(IngestorStatus::new(session.exchange()));
        Self {
            session,
            status,
            backoff,
            cancel,
        }
    }

    /// Shared status handle for health checks.
    #[must_use]
    pub fn status(&self) -> Arc<IngestorStatus> {
        Arc::clone(&self.status)
    }

    /// Run sessions until cancellation or a bootstrap failure.
    ///
    /// # Errors
    ///
    /// Returns [`IngestorError::Cancelled`] on cancellation and
    /// [`IngestorError::Bootstrap`] when a session cannot be set up.
    pub async fn run(&self) -> Result<Infallible, IngestorError> {
        let exchange = self.session.exchange();
        let mut backoff = Backoff::new(self.backoff.clone());

        loop {
            self.status.set_state(IngestorState::Bootstrapping);
            let session = self.cancel.child_token();

            let bootstrap = tokio::select! {
                () = self.cancel.cancelled() => {
                    session.cancel();
                    return Err(self.stopped());
                }
                result = self.session.bootstrap(&session) => result,
            };

            let mut connection = match bootstrap {
                Ok(connection) => connection,
                Err(source) => {
                    session.cancel();
                    self.status.record_error(source.to_string());
                    self.status.set_state(IngestorState::Stopped);
                    tracing::error!(exchange = %exchange, error = %source, "Bootstrap failed");
                    return Err(IngestorError::bootstrap(exchange, source));
                }
            };

            self.status.record_session();
            metrics::record_session_started(exchange);
            self.status.set_state(IngestorState::Subscribed);
            tracing::info!(exchange = %exchange, "Session subscribed");

            let reason = self.listen(&mut connection, &mut backoff).await;

            self.status.set_state(IngestorState::Closing);
            session.cancel();
            connection.close().await;

            if reason.is_cancelled() {
                return Err(self.stopped());
            }

            metrics::record_session_failure(exchange);
            self.status.record_error(reason.to_string());
            self.status.set_state(IngestorState::Idle);

            let delay = backoff.next_delay();
            tracing::warn!(
                exchange = %exchange,
                error = %reason,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                failures = backoff.failures(),
                "Session ended, re-bootstrapping"
            );

            tokio::select! {
                () = self.cancel.cancelled() => return Err(self.stopped()),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn listen(&self, connection: &mut WsConnection, backoff: &mut Backoff) -> IngestorError {
        let exchange = self.session.exchange();
        let mut listening = false;

        loop {
            let message = tokio::select! {
                () = self.cancel.cancelled() => return IngestorError::Cancelled,
                message = connection.next_message() => message,
            };

            let message = match message {
                Some(Ok(message)) => message,
                Some(Err(e)) => return IngestorError::Transport(e),
                None => return IngestorError::ConnectionClosed,
            };

            let payload = match &message {
                Message::Text(text) => Ok(text.as_str()),
                Message::Binary(data) => std::str::from_utf8(data).map_err(|_| FrameError::NotUtf8),
                Message::Close(frame) => {
                    tracing::debug!(exchange = %exchange, frame = ?frame, "Close frame received");
                    return IngestorError::ConnectionClosed;
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };

            if !listening {
                listening = true;
                backoff.reset();
                self.status.set_state(IngestorState::Listening);
            }
            self.status.record_frame();
            metrics::record_frame_received(exchange);

            match payload {
                Ok(text) => {
                    tokio::select! {
                        () = self.cancel.cancelled() => return IngestorError::Cancelled,
                        () = self.session.handle_text(text) => {}
                    }
                }
                Err(e) => report_dropped(exchange, &e, "<binary>"),
            }
        }
    }

    fn stopped(&self) -> IngestorError {
        self.status.set_state(IngestorState::Stopped);
        tracing::info!(exchange = %self.session.exchange(), "Ingestor stopped");
        IngestorError::Cancelled
    }
}

/// Publish a decoded snapshot, logging any rejection.
pub async fn publish(updater: &dyn MarketUpdater, market: Market) {
    let exchange = market.exchange;
    let trading_pair = market.trading_pair.clone();

    match updater.update_market(market).await {
        Ok(()) => tracing::trace!(exchange = %exchange, trading_pair, "Market updated"),
        Err(e @ MarketError::InvalidTimestamp { .. }) => {
            tracing::debug!(exchange = %exchange, trading_pair, error = %e, "Stale market update dropped");
        }
        Err(e) => {
            tracing::error!(exchange = %exchange, trading_pair, error = %e, "Market update failed");
        }
    }
}

/// Log and count a dropped frame.
pub fn report_dropped(exchange: Exchange, error: &FrameError, payload: &str) {
    metrics::record_frame_dropped(exchange, error.drop_reason());

    match error {
        FrameError::UnknownSymbol(symbol) => {
            tracing::warn!(exchange = %exchange, symbol, "Frame for unconfigured symbol dropped");
        }
        _ => tracing::error!(exchange = %exchange, error = %error, payload, "Frame dropped"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use futures_util::SinkExt;
    use parking_lot::Mutex;
    use tokio::net::TcpListener;

    use super::*;
    use crate::infrastructure::exchange::http::HttpError;

    fn fast_backoff() -> BackoffConfig {
        BackoffConfig {
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }

    struct FailingSession;

    #[async_trait]
    impl ExchangeSession for FailingSession {
        fn exchange(&self) -> Exchange {
            Exchange::Binance
        }

        async fn bootstrap(&self, _: &CancellationToken) -> Result<WsConnection, BootstrapError> {
            Err(BootstrapError::Http(HttpError::Status {
                status: reqwest::StatusCode::UNAUTHORIZED,
                body: "invalid api key".to_string(),
            }))
        }

        async fn handle_text(&self, _: &str) {}
    }

    struct PendingSession;

    #[async_trait]
    impl ExchangeSession for PendingSession {
        fn exchange(&self) -> Exchange {
            Exchange::Kucoin
        }

        async fn bootstrap(&self, _: &CancellationToken) -> Result<WsConnection, BootstrapError> {
            std::future::pending().await
        }

        async fn handle_text(&self, _: &str) {}
    }

    /// Dials a local server that sends one frame and hangs up.
    struct LocalSession {
        url: String,
        bootstraps: AtomicU32,
        frames: Mutex<Vec<String>>,
        session_tokens: Mutex<Vec<CancellationToken>>,
    }

    #[async_trait]
    impl ExchangeSession for LocalSession {
        fn exchange(&self) -> Exchange {
            Exchange::Kucoin
        }

        async fn bootstrap(&self, session: &CancellationToken) -> Result<WsConnection, BootstrapError> {
            self.bootstraps.fetch_add(1, Ordering::SeqCst);
            self.session_tokens.lock().push(session.clone());
            WsConnection::dial(&self.url)
                .await
                .map_err(BootstrapError::Dial)
        }

        async fn handle_text(&self, text: &str) {
            self.frames.lock().push(text.to_string());
        }
    }

    async fn spawn_hangup_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                    ws.send(Message::Ping(vec![1].into())).await.unwrap();
                    ws.send(Message::text("hello")).await.unwrap();
                    ws.send(Message::Binary(vec![0xff, 0xfe].into())).await.unwrap();
                    drop(ws);
                });
            }
        });

        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn bootstrap_failure_is_fatal() {
        let ingestor = Ingestor::new(FailingSession, fast_backoff(), CancellationToken::new());
        let status = ingestor.status();

        let Err(err) = ingestor.run().await;

        assert!(matches!(
            err,
            IngestorError::Bootstrap {
                exchange: Exchange::Binance,
                ..
            }
        ));
        assert_eq!(status.state(), IngestorState::Stopped);
        assert_eq!(status.sessions(), 0);
        assert!(status.last_error().unwrap().contains("401"));
    }

    #[tokio::test]
    async fn cancellation_interrupts_bootstrap() {
        let cancel = CancellationToken::new();
        let ingestor = Ingestor::new(PendingSession, fast_backoff(), cancel.clone());
        let status = ingestor.status();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let Err(err) = tokio::time::timeout(Duration::from_secs(1), ingestor.run())
            .await
            .expect("run should return after cancellation");
        canceller.await.unwrap();

        assert!(err.is_cancelled());
        assert_eq!(status.state(), IngestorState::Stopped);
    }

    #[tokio::test]
    async fn transport_loss_re_bootstraps_until_cancelled() {
        let session = LocalSession {
            url: spawn_hangup_server().await,
            bootstraps: AtomicU32::new(0),
            frames: Mutex::new(Vec::new()),
            session_tokens: Mutex::new(Vec::new()),
        };
        let cancel = CancellationToken::new();
        let ingestor = Arc::new(Ingestor::new(session, fast_backoff(), cancel.clone()));
        let status = ingestor.status();

        let runner = {
            let ingestor = Arc::clone(&ingestor);
            tokio::spawn(async move { ingestor.run().await })
        };

        tokio::time::timeout(Duration::from_secs(5), async {
            while ingestor.session.bootstraps.load(Ordering::SeqCst) < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("ingestor should keep re-bootstrapping");

        cancel.cancel();
        let Err(err) = runner.await.unwrap();
        assert!(err.is_cancelled());
        assert_eq!(status.state(), IngestorState::Stopped);

        let frames = ingestor.session.frames.lock().clone();
        assert!(frames.len() >= 2);
        assert!(frames.iter().all(|f| f == "hello"));

        // Every finished session cancelled its own token.
        let tokens = ingestor.session.session_tokens.lock().clone();
        assert!(tokens.iter().all(CancellationToken::is_cancelled));
    }
}
