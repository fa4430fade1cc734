//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the market use-cases and the port interfaces
//! that connect them to stores, ingestors and the RPC server.

/// Port interfaces for stores, clocks and use-case capabilities.
pub mod ports;

/// Market use-case service.
pub mod services;
