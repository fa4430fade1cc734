//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Binance and KuCoin WebSocket ingestors.
pub mod exchange;

/// gRPC query server implementation.
pub mod grpc;

/// Redis and in-memory market stores.
pub mod store;

/// Configuration loading.
pub mod config;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Process start-up and shutdown wiring.
pub mod runtime;

/// Logging and OpenTelemetry tracing integration.
pub mod telemetry;
