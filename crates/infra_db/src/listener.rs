//! Live ledger snapshots over LISTEN/NOTIFY
//!
//! A trigger on `ledger_entries` publishes the distributor id on the
//! [`LEDGER_CHANNEL`] after every insert or update. One feeder task per
//! subscription listens on that channel and refetches the full snapshot
//! whenever its distributor is named, or whenever the connection had to be
//! re-established (notifications may have been missed in between).
//!
//! Reconnects back off exponentially between `retry_base` and `retry_max`.
//! The task ends as soon as the subscriber drops its receiver.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgListener;
use tokio::sync::watch;
use tracing::{debug, warn};

use core_kernel::DistributorId;
use domain_ledger::{LedgerConfig, LedgerSnapshot};

use crate::adapters::ledger::PostgresLedgerAdapter;

/// Channel the ledger trigger notifies on
pub const LEDGER_CHANNEL: &str = "ledger_changes";

/// Reconnect timing for live subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub retry_base: Duration,
    pub retry_max: Duration,
}

impl StreamConfig {
    pub fn from_ledger_config(config: &LedgerConfig) -> Self {
        Self {
            retry_base: config.stream_retry_base(),
            retry_max: config.stream_retry_max(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::from_ledger_config(&LedgerConfig::default())
    }
}

/// Exponential backoff: `base × 2^attempt`, capped at `max`
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl ReconnectBackoff {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            base: config.retry_base,
            max: config.retry_max,
            attempt: 0,
        }
    }

    /// Delay before the next reconnect attempt
    pub fn next_delay(&mut self) -> Duration {
        let factor = 2u32.saturating_pow(self.attempt.min(16));
        self.attempt = self.attempt.saturating_add(1);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Called once a connection is healthy again
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Keeps `tx` fed with fresh snapshots until every receiver is gone
pub(crate) async fn feed_snapshots(
    adapter: PostgresLedgerAdapter,
    distributor_id: DistributorId,
    tx: watch::Sender<LedgerSnapshot>,
    config: StreamConfig,
) {
    let mut backoff = ReconnectBackoff::new(config);
    let wanted = distributor_id.to_string();

    loop {
        match PgListener::connect_with(adapter.pool()).await {
            Ok(mut listener) => match listener.listen(LEDGER_CHANNEL).await {
                Ok(()) => {
                    refresh(&adapter, distributor_id, &tx).await;
                    backoff.reset();

                    loop {
                        tokio::select! {
                            _ = tx.closed() => return,
                            received = listener.try_recv() => match received {
                                Ok(Some(notification)) if notification.payload() == wanted => {
                                    refresh(&adapter, distributor_id, &tx).await;
                                }
                                Ok(Some(_)) => {}
                                Ok(None) => {
                                    debug!(distributor_id = %distributor_id, "ledger listener reconnected");
                                    refresh(&adapter, distributor_id, &tx).await;
                                }
                                Err(e) => {
                                    warn!(distributor_id = %distributor_id, error = %e, "ledger listener failed");
                                    break;
                                }
                            },
                        }
                    }
                }
                Err(e) => warn!(distributor_id = %distributor_id, error = %e, "LISTEN failed"),
            },
            Err(e) => warn!(distributor_id = %distributor_id, error = %e, "ledger listener could not connect"),
        }

        let delay = backoff.next_delay();
        debug!(
            distributor_id = %distributor_id,
            attempt = backoff.attempt(),
            delay_ms = delay.as_millis() as u64,
            "retrying ledger listener"
        );
        tokio::select! {
            _ = tx.closed() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Publishes the current snapshot unless it equals the last one sent
async fn refresh(
    adapter: &PostgresLedgerAdapter,
    distributor_id: DistributorId,
    tx: &watch::Sender<LedgerSnapshot>,
) {
    match adapter.snapshot(distributor_id).await {
        Ok(entries) => {
            tx.send_if_modified(|current| {
                if current.as_slice() == entries.as_slice() {
                    false
                } else {
                    *current = Arc::new(entries);
                    true
                }
            });
        }
        Err(e) => warn!(distributor_id = %distributor_id, error = %e, "ledger snapshot refresh failed"),
    }
}
