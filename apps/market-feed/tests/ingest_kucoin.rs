//! KuCoin Ingestion Integration Tests
//!
//! Runs the real KuCoin session against wiremock for the bullet-token API
//! and a local WebSocket server standing in for the instance server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures_util::SinkExt;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{RecordingUpdater, WsServer, fast_backoff, next_market};
use market_feed::infrastructure::config::KucoinSettings;
use market_feed::infrastructure::exchange::BootstrapError;
use market_feed::{Exchange, Ingestor, IngestorError, IngestorState, KucoinSession, ManualClock, TradingPair};

const SNAPSHOT: &str = r#"{"type":"message","topic":"/market/snapshot:BTC-USDT","subject":"trade.snapshot","data":{"sequence":"1","data":{"buy":34999.0,"sell":35001.0,"lastTradedPrice":35000.5,"datetime":1700000000000,"volValue":9876543.21,"symbol":"BTC-USDT"}}}"#;

async fn mock_bullet(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/v1/bullet-public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn bullet(endpoint: &str, ping_interval: u64) -> serde_json::Value {
    json!({
        "code": "200000",
        "data": {
            "token": "tok",
            "instanceServers": [{
                "endpoint": endpoint,
                "encrypt": true,
                "protocol": "websocket",
                "pingInterval": ping_interval,
                "pingTimeout": 10000
            }]
        }
    })
}

fn session(rest: &MockServer, updater: RecordingUpdater) -> KucoinSession {
    let settings = KucoinSettings {
        hostname: rest.uri(),
    };
    KucoinSession::new(
        &settings,
        Client::new(),
        &[TradingPair::new("BTC", "USDT")],
        Arc::new(updater),
    )
}

#[tokio::test]
async fn subscribes_pings_and_streams_snapshots() {
    let rest = MockServer::start().await;
    let mut ws = WsServer::start().await;
    mock_bullet(&rest, bullet(&format!("{}/endpoint", ws.url), 600)).await;

    let clock = ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
    let (updater, mut markets) = RecordingUpdater::new();
    let session = session(&rest, updater).with_clock(Arc::new(clock));
    let cancel = CancellationToken::new();
    let ingestor = Ingestor::new(session, fast_backoff(), cancel.clone());
    let status = ingestor.status();
    let runner = tokio::spawn(async move { ingestor.run().await });

    let mut conn = ws.accept().await;
    assert_eq!(conn.target, "/endpoint?token=tok");
    assert_eq!(
        conn.next_text().await,
        r#"{"id":"1700000000000000000","type":"subscribe","topic":"/market/snapshot:BTC-USDT","privateChannel":false,"response":false}"#
    );
    // pingInterval 600ms leaves a 100ms ping period.
    assert_eq!(
        conn.next_text().await,
        r#"{"id":"1700000000000000001","type":"ping"}"#
    );

    conn.ws
        .send(Message::text(r#"{"id":"hQvf8jkno","type":"welcome"}"#))
        .await
        .unwrap();
    conn.ws.send(Message::text(SNAPSHOT)).await.unwrap();

    let market = next_market(&mut markets).await;
    assert_eq!(market.trading_pair, "BTC/USDT");
    assert_eq!(market.exchange, Exchange::Kucoin);
    assert_eq!(market.best_buy_price, Decimal::from(34999));
    assert_eq!(market.best_sell_price, Decimal::from(35001));
    assert_eq!(market.last_traded_price, Decimal::from_str("35000.5").unwrap());
    assert_eq!(market.timestamp, Utc.timestamp_millis_opt(1_700_000_000_000).unwrap());
    assert!((market.volume_24hr - 9_876_543.21).abs() < f64::EPSILON);
    assert_eq!(status.frames_received(), 2);

    cancel.cancel();
    let Err(err) = runner.await.unwrap();
    assert!(err.is_cancelled());
    assert_eq!(status.state(), IngestorState::Stopped);
}

#[tokio::test]
async fn reconnects_with_a_fresh_token() {
    let rest = MockServer::start().await;
    let mut ws = WsServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/bullet-public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bullet(&format!("{}/endpoint", ws.url), 30_000)))
        .expect(2)
        .mount(&rest)
        .await;

    let (updater, mut markets) = RecordingUpdater::new();
    let cancel = CancellationToken::new();
    let ingestor = Ingestor::new(session(&rest, updater), fast_backoff(), cancel.clone());
    let status = ingestor.status();
    let runner = tokio::spawn(async move { ingestor.run().await });

    let mut conn = ws.accept().await;
    conn.next_text().await;
    conn.ws.send(Message::text(SNAPSHOT)).await.unwrap();
    next_market(&mut markets).await;
    drop(conn);

    let mut conn = ws.accept().await;
    assert!(conn.next_text().await.contains(r#""topic":"/market/snapshot:BTC-USDT""#));
    assert_eq!(status.sessions(), 2);

    cancel.cancel();
    let Err(err) = runner.await.unwrap();
    assert!(err.is_cancelled());
    ws.assert_no_connection(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn token_request_failure_is_fatal() {
    let rest = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/bullet-public"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream unavailable"))
        .expect(1)
        .mount(&rest)
        .await;

    let (updater, _markets) = RecordingUpdater::new();
    let ingestor = Ingestor::new(session(&rest, updater), fast_backoff(), CancellationToken::new());

    let Err(err) = tokio::time::timeout(Duration::from_secs(5), ingestor.run())
        .await
        .unwrap();

    assert!(matches!(
        err,
        IngestorError::Bootstrap {
            exchange: Exchange::Kucoin,
            source: BootstrapError::Http(_),
        }
    ));
    assert_eq!(ingestor.status().state(), IngestorState::Stopped);
    assert!(ingestor.status().last_error().is_some());
}

#[tokio::test]
async fn missing_instance_servers_is_fatal() {
    let rest = MockServer::start().await;
    mock_bullet(
        &rest,
        json!({"code": "200000", "data": {"token": "tok", "instanceServers": []}}),
    )
    .await;

    let (updater, _markets) = RecordingUpdater::new();
    let ingestor = Ingestor::new(session(&rest, updater), fast_backoff(), CancellationToken::new());

    let Err(err) = tokio::time::timeout(Duration::from_secs(5), ingestor.run())
        .await
        .unwrap();

    assert!(matches!(
        err,
        IngestorError::Bootstrap {
            source: BootstrapError::NoInstanceServers,
            ..
        }
    ));
}
