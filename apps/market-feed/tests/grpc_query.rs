//! gRPC Query Integration Tests
//!
//! Writes markets through the use-case layer into the in-memory store and
//! reads them back through a real tonic server and client.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use tonic::transport::{Channel, Server};
use tonic::{Code, Request};

use market_feed::{
    Exchange, InMemoryMarketStore, ManualClock, Market, MarketDataServer, MarketError,
    MarketService, MarketUpdater,
    proto::{
        GetMarketRequest, market_data_service_client::MarketDataServiceClient,
        market_data_service_server::MarketDataServiceServer,
    },
};

struct Harness {
    client: MarketDataServiceClient<Channel>,
    service: Arc<MarketService>,
    clock: ManualClock,
    server: tokio::task::JoinHandle<()>,
}

/// Start a test gRPC server on a random port and return a client.
async fn setup_test_server() -> Harness {
    let clock = ManualClock::new(Utc.timestamp_millis_opt(1_700_000_001_000).unwrap());
    let store = Arc::new(InMemoryMarketStore::new(
        Duration::from_secs(600),
        Arc::new(clock.clone()),
    ));
    let service = Arc::new(MarketService::new(store, Arc::new(clock.clone())));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let grpc = MarketDataServiceServer::new(MarketDataServer::new(service.clone()));
    let server = tokio::spawn(async move {
        Server::builder()
            .add_service(grpc)
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = MarketDataServiceClient::connect(format!("http://{addr}"))
        .await
        .unwrap();

    Harness {
        client,
        service,
        clock,
        server,
    }
}

fn market(exchange: Exchange, last: &str, millis: i64) -> Market {
    Market {
        trading_pair: "BTC/USDT".to_string(),
        exchange,
        best_buy_price: Decimal::from_str("34999.00").unwrap(),
        best_sell_price: Decimal::from_str("35001.00").unwrap(),
        last_traded_price: Decimal::from_str(last).unwrap(),
        timestamp: Utc.timestamp_millis_opt(millis).unwrap(),
        volume_24hr: 1_234_567.89,
    }
}

fn request(pair: &str) -> Request<GetMarketRequest> {
    Request::new(GetMarketRequest {
        trading_pair: pair.to_string(),
    })
}

#[tokio::test]
async fn returns_only_exchanges_with_live_markets() {
    let mut harness = setup_test_server().await;
    harness
        .service
        .update_market(market(Exchange::Binance, "35000.50", 1_700_000_000_000))
        .await
        .unwrap();

    let response = harness
        .client
        .get_market(request("BTC/USDT"))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.markets.len(), 1);
    let got = &response.markets[0];
    assert_eq!(got.trading_pair, "BTC/USDT");
    assert_eq!(got.exchange, "binance");
    assert_eq!(got.last_traded_price, "35000.5");
    assert_eq!(got.best_buy_price, "34999");
    assert_eq!(got.best_sell_price, "35001");
    assert_eq!(got.volume_24hr, "1234567.89");
    assert_eq!(got.timestamp.as_ref().unwrap().seconds, 1_700_000_000);

    harness.server.abort();
}

#[tokio::test]
async fn markets_follow_exchange_order() {
    let mut harness = setup_test_server().await;
    harness
        .service
        .update_market(market(Exchange::Kucoin, "35000.75", 1_700_000_000_500))
        .await
        .unwrap();
    harness
        .service
        .update_market(market(Exchange::Binance, "35000.50", 1_700_000_000_000))
        .await
        .unwrap();

    let response = harness
        .client
        .get_market(request("BTC/USDT"))
        .await
        .unwrap()
        .into_inner();

    let exchanges: Vec<_> = response.markets.iter().map(|m| m.exchange.as_str()).collect();
    assert_eq!(exchanges, ["binance", "kucoin"]);

    harness.server.abort();
}

#[tokio::test]
async fn unknown_pair_is_not_found() {
    let mut harness = setup_test_server().await;

    let status = harness
        .client
        .get_market(request("DOGE/USDT"))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::NotFound);

    harness.server.abort();
}

#[tokio::test]
async fn pair_lookup_is_case_sensitive() {
    let mut harness = setup_test_server().await;
    harness
        .service
        .update_market(market(Exchange::Binance, "35000.50", 1_700_000_000_000))
        .await
        .unwrap();

    let status = harness
        .client
        .get_market(request("btc/usdt"))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::NotFound);

    harness.server.abort();
}

#[tokio::test]
async fn stale_update_keeps_stored_market() {
    let mut harness = setup_test_server().await;
    harness
        .service
        .update_market(market(Exchange::Binance, "35000.50", 1_700_000_000_000))
        .await
        .unwrap();

    let err = harness
        .service
        .update_market(market(Exchange::Binance, "1.00", 1_699_999_999_999))
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::InvalidTimestamp { .. }));

    let response = harness
        .client
        .get_market(request("BTC/USDT"))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(response.markets[0].last_traded_price, "35000.5");

    harness.server.abort();
}

#[tokio::test]
async fn expired_markets_are_not_found() {
    let mut harness = setup_test_server().await;
    harness
        .service
        .update_market(market(Exchange::Binance, "35000.50", 1_700_000_000_000))
        .await
        .unwrap();

    harness.clock.advance(chrono::Duration::seconds(601));

    let status = harness
        .client
        .get_market(request("BTC/USDT"))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);

    harness.server.abort();
}
