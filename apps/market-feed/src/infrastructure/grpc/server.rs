//! gRPC Query Server Implementation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use prost_types::Timestamp;
use tonic::{Code, Request, Response, Status};

use super::proto::arbitrage::v1::{
    self as proto, GetMarketRequest, GetMarketResponse,
    market_data_service_server::MarketDataService,
};
use crate::application::ports::MarketQuery;
use crate::domain::errors::MarketError;
use crate::domain::market::Market;
use crate::infrastructure::metrics;

const GET_MARKET: &str = "GetMarket";

// =============================================================================
// Serving Status
// =============================================================================

/// Whether the server is accepting new calls; flips off on shutdown.
#[derive(Debug, Default)]
pub struct ServingStatus {
    serving: AtomicBool,
}

impl ServingStatus {
    /// Create a status that is not yet serving.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            serving: AtomicBool::new(false),
        }
    }

    /// Mark as serving.
    pub fn set_serving(&self) {
        self.serving.store(true, Ordering::Release);
    }

    /// Mark as draining or stopped.
    pub fn set_not_serving(&self) {
        self.serving.store(false, Ordering::Release);
    }

    /// Current status.
    #[must_use]
    pub fn is_serving(&self) -> bool {
        self.serving.load(Ordering::Acquire)
    }
}

// =============================================================================
// gRPC Server
// =============================================================================

/// `MarketDataService` implementation.
#[derive(Clone)]
pub struct MarketDataServer {
    markets: Arc<dyn MarketQuery>,
}

impl MarketDataServer {
    /// Create a server over the market query port.
    #[must_use]
    pub fn new(markets: Arc<dyn MarketQuery>) -> Self {
        Self { markets }
    }
}

#[tonic::async_trait]
impl MarketDataService for MarketDataServer {
    #[tracing::instrument(skip_all, fields(trading_pair = %request.get_ref().trading_pair))]
    async fn get_market(
        &self,
        request: Request<GetMarketRequest>,
    ) -> Result<Response<GetMarketResponse>, Status> {
        let trading_pair = request.into_inner().trading_pair;

        let result = self
            .markets
            .get_markets(&trading_pair)
            .await
            .map(|markets| GetMarketResponse {
                markets: markets.iter().map(market_to_proto).collect(),
            })
            .map_err(|e| error_to_status(&e));

        let code = result.as_ref().map_or_else(Status::code, |_| Code::Ok);
        metrics::record_rpc_request(GET_MARKET, code);

        match &result {
            Ok(response) => {
                tracing::debug!(markets = response.markets.len(), "GetMarket served");
            }
            Err(status) if status.code() == Code::NotFound => {
                tracing::debug!("GetMarket found no markets");
            }
            Err(status) => tracing::error!(error = %status.message(), "GetMarket failed"),
        }

        result.map(Response::new)
    }
}

// =============================================================================
// Conversion Functions
// =============================================================================

fn error_to_status(error: &MarketError) -> Status {
    if error.is_not_found() {
        Status::not_found(error.to_string())
    } else {
        Status::internal(error.to_string())
    }
}

fn datetime_to_timestamp(dt: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: dt.timestamp(),
        nanos: i32::try_from(dt.timestamp_subsec_nanos()).unwrap_or(i32::MAX),
    }
}

/// Wire form of a snapshot: normalized decimal strings and the shortest
/// round-trip rendering of the volume.
#[must_use]
pub fn market_to_proto(market: &Market) -> proto::Market {
    proto::Market {
        trading_pair: market.trading_pair.clone(),
        exchange: market.exchange.to_string(),
        timestamp: Some(datetime_to_timestamp(market.timestamp)),
        last_traded_price: market.last_traded_price.normalize().to_string(),
        best_buy_price: market.best_buy_price.normalize().to_string(),
        best_sell_price: market.best_sell_price.normalize().to_string(),
        volume_24hr: market.volume_24hr.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::market::Exchange;

    /// Returns the given markets, or not-found when there are none.
    struct FixedQuery(Vec<Market>);

    #[async_trait]
    impl MarketQuery for FixedQuery {
        async fn get_markets(&self, trading_pair: &str) -> Result<Vec<Market>, MarketError> {
            if self.0.is_empty() {
                return Err(MarketError::NotFound {
                    trading_pair: trading_pair.to_string(),
                    exchange: None,
                });
            }
            Ok(self.0.clone())
        }
    }

    struct FailingQuery;

    #[async_trait]
    impl MarketQuery for FailingQuery {
        async fn get_markets(&self, _: &str) -> Result<Vec<Market>, MarketError> {
            Err(MarketError::Backend("connection refused".to_string()))
        }
    }

    fn market() -> Market {
        Market {
            trading_pair: "BTC/USDT".to_string(),
            exchange: Exchange::Binance,
            best_buy_price: Decimal::from_str("34999.00").unwrap(),
            best_sell_price: Decimal::from_str("35001.00").unwrap(),
            last_traded_price: Decimal::from_str("35000.50").unwrap(),
            timestamp: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
            volume_24hr: 1_234_567.89,
        }
    }

    fn request() -> Request<GetMarketRequest> {
        Request::new(GetMarketRequest {
            trading_pair: "BTC/USDT".to_string(),
        })
    }

    #[test]
    fn market_conversion() {
        let proto = market_to_proto(&market());

        assert_eq!(proto.trading_pair, "BTC/USDT");
        assert_eq!(proto.exchange, "binance");
        assert_eq!(proto.last_traded_price, "35000.5");
        assert_eq!(proto.best_buy_price, "34999");
        assert_eq!(proto.best_sell_price, "35001");
        assert_eq!(proto.volume_24hr, "1234567.89");

        let ts = proto.timestamp.unwrap();
        assert_eq!(ts.seconds, 1_700_000_000);
        assert_eq!(ts.nanos, 123_000_000);
    }

    #[test]
    fn serving_status_toggles() {
        let status = ServingStatus::new();
        assert!(!status.is_serving());
        status.set_serving();
        assert!(status.is_serving());
        status.set_not_serving();
        assert!(!status.is_serving());
    }

    #[tokio::test]
    async fn returns_markets() {
        let server = MarketDataServer::new(Arc::new(FixedQuery(vec![market()])));

        let response = server.get_market(request()).await.unwrap().into_inner();

        assert_eq!(response.markets.len(), 1);
        assert_eq!(response.markets[0].exchange, "binance");
    }

    #[tokio::test]
    async fn not_found_maps_to_not_found() {
        let server = MarketDataServer::new(Arc::new(FixedQuery(Vec::new())));

        let status = server.get_market(request()).await.unwrap_err();

        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), "market not found for BTC/USDT");
    }

    #[tokio::test]
    async fn backend_failure_maps_to_internal() {
        let server = MarketDataServer::new(Arc::new(FailingQuery));

        let status = server.get_market(request()).await.unwrap_err();

        assert_eq!(status.code(), Code::Internal);
    }
}
