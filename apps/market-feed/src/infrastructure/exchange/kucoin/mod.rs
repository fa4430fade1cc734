//! KuCoin Ingestor
//!
//! Public bullet-token bootstrap, application-level pings and
//! `/market/snapshot` decoding.

pub mod messages;
pub mod rest;
pub mod session;

pub use rest::{BulletToken, InstanceServer, KucoinRestClient};
pub use session::{FrameIds, KucoinSession, ping_period};
