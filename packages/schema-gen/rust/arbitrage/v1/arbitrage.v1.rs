// @generated
// This file is @generated by prost-build.
/// GetMarketRequest names a trading pair in canonical BASE/QUOTE form.
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct GetMarketRequest {
    /// Canonical trading pair, e.g. "BTC/USDT". Case-sensitive.
    #[prost(string, tag = "1")]
    pub trading_pair: ::prost::alloc::string::String,
}
/// GetMarketResponse carries the snapshots found for the requested pair.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetMarketResponse {
    #[prost(message, repeated, tag = "1")]
    pub markets: ::prost::alloc::vec::Vec<Market>,
}
/// Market is the canonical ticker snapshot of one pair on one exchange.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Market {
    /// Canonical trading pair, e.g. "BTC/USDT".
    #[prost(string, tag = "1")]
    pub trading_pair: ::prost::alloc::string::String,
    /// Lowercase exchange name, e.g. "binance".
    #[prost(string, tag = "2")]
    pub exchange: ::prost::alloc::string::String,
    /// Exchange-supplied event time, millisecond resolution.
    #[prost(message, optional, tag = "3")]
    pub timestamp: ::core::option::Option<::prost_types::Timestamp>,
    /// Decimal string.
    #[prost(string, tag = "4")]
    pub last_traded_price: ::prost::alloc::string::String,
    /// Decimal string.
    #[prost(string, tag = "5")]
    pub best_buy_price: ::prost::alloc::string::String,
    /// Decimal string.
    #[prost(string, tag = "6")]
    pub best_sell_price: ::prost::alloc::string::String,
    /// Rolling 24h traded notional in the quote asset, shortest round-trip float.
    #[prost(string, tag = "7")]
    pub volume_24hr: ::prost::alloc::string::String,
}
include!("arbitrage.v1.tonic.rs");
// @@protoc_insertion_point(module)
