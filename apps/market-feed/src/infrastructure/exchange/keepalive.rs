//! Session Keep-Alive
//!
//! Periodic background work tied to one session: Binance listen-key
//! refreshes and KuCoin application pings. The task fires every `period`
//! (first beat one period after start), logs failures without stopping,
//! and exits as soon as its session token is cancelled.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::domain::market::Exchange;
use crate::infrastructure::metrics;

/// Configuration for one keep-alive task.
#[derive(Debug, Clone, Copy)]
pub struct KeepAlive {
    /// Exchange label for logs and metrics.
    pub exchange: Exchange,
    /// What the beat does, for logs ("listen-key refresh", "ping").
    pub name: &'static str,
    /// Time between beats.
    pub period: Duration,
}

impl KeepAlive {
    /// Spawn the task. `beat` runs once per period until `token` is cancelled.
    pub fn spawn<F, Fut, E>(self, token: CancellationToken, mut beat: F) -> JoinHandle<()>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send,
        E: Display,
    {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                tokio::select! {
                    () = token.cancelled() => break,
                    result = beat() => match result {
                        Ok(()) => tracing::trace!(
                            exchange = %self.exchange,
                            task = self.name,
                            "Keep-alive sent"
                        ),
                        Err(e) => {
                            metrics::record_keepalive_failure(self.exchange);
                            tracing::warn!(
                                exchange = %self.exchange,
                                task = self.name,
                                error = %e,
                                "Keep-alive failed"
                            );
                        }
                    },
                }
            }

            tracing::debug!(exchange = %self.exchange, task = self.name, "Keep-alive stopped");
        })
    }
}
