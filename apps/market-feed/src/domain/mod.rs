//! Domain Layer - Canonical market model.
//!
//! Exchange-independent types with no I/O. Everything outside this layer
//! converts to and from these types.

/// Error kinds shared across layers.
pub mod errors;

/// `Exchange`, `TradingPair` and `Market`.
pub mod market;
