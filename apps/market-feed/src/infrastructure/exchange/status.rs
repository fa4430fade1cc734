//! Ingestor Status
//!
//! Shared, lock-light view of an ingestor's lifecycle for health
//! endpoints and logs.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::domain::market::Exchange;

/// Lifecycle state of an ingestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum IngestorState {
    /// Not connected; waiting to bootstrap.
    Idle = 0,
    /// Acquiring a session token, dialing and subscribing.
    Bootstrapping = 1,
    /// Subscribed; no frame received yet.
    Subscribed = 2,
    /// Receiving frames.
    Listening = 3,
    /// Tearing down the session.
    Closing = 4,
    /// Terminal: cancelled or failed bootstrap.
    Stopped = 5,
}

impl IngestorState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Bootstrapping,
            2 => Self::Subscribed,
            3 => Self::Listening,
            4 => Self::Closing,
            5 => Self::Stopped,
            _ => Self::Idle,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Bootstrapping => "bootstrapping",
            Self::Subscribed => "subscribed",
            Self::Listening => "listening",
            Self::Closing => "closing",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for IngestorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared status of one ingestor.
#[derive(Debug)]
pub struct IngestorStatus {
    exchange: Exchange,
    state: AtomicU8,
    sessions: AtomicU64,
    frames_received: AtomicU64,
    last_frame_at: RwLock<Option<DateTime<Utc>>>,
    last_error: RwLock<Option<String>>,
}

impl IngestorStatus {
    /// Create an idle status.
    #[must_use]
    pub const fn new(exchange: Exchange) -> Self {
        Self {
            exchange,
            state: AtomicU8::new(IngestorState::Idle as u8),
            sessions: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            last_frame_at: RwLock::new(None),
            last_error: RwLock::new(None),
        }
    }

    /// Exchange this status belongs to.
    #[must_use]
    pub const fn exchange(&self) -> Exchange {
        self.exchange
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> IngestorState {
        IngestorState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Transition to `state`.
    pub fn set_state(&self, state: IngestorState) {
        let previous = IngestorState::from_u8(self.state.swap(state as u8, Ordering::AcqRel));
        if previous != state {
            tracing::debug!(
                exchange = %self.exchange,
                from = %previous,
                to = %state,
                "Ingestor state changed"
            );
        }
    }

    /// Record a session that completed bootstrap.
    pub fn record_session(&self) {
        self.sessions.fetch_add(1, Ordering::Relaxed);
        *self.last_error.write() = None;
    }

    /// Record an inbound frame.
    pub fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        *self.last_frame_at.write() = Some(Utc::now());
    }

    /// Record the error that ended a session.
    pub fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write() = Some(message.into());
    }

    /// Sessions that completed bootstrap.
    #[must_use]
    pub fn sessions(&self) -> u64 {
        self.sessions.load(Ordering::Relaxed)
    }

    /// Frames received across all sessions.
    #[must_use]
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Time of the last inbound frame.
    #[must_use]
    pub fn last_frame_at(&self) -> Option<DateTime<Utc>> {
        *self.last_frame_at.read()
    }

    /// Error that ended the most recent failed session.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Whether the ingestor is currently receiving.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(
            self.state(),
            IngestorState::Subscribed | IngestorState::Listening
        )
    }
}
