//! Live ledger subscriptions
//!
//! Every emission is the full, authoritative snapshot of one distributor's
//! ledger ordered newest first. Consumers never receive diffs.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};

use crate::entry::LedgerEntry;

/// One full ledger snapshot
pub type LedgerSnapshot = Arc<Vec<LedgerEntry>>;

/// Aborts the task feeding a subscription when the last handle goes away
#[derive(Debug, Default)]
struct FeederGuard(Option<JoinHandle<()>>);

impl Drop for FeederGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

/// A cancellable, restartable view of one distributor's ledger
///
/// Dropping the subscription (or calling [`LedgerSubscription::unsubscribe`])
/// stops any background feeder task. It never touches the stored entries.
#[derive(Debug)]
pub struct LedgerSubscription {
    receiver: watch::Receiver<LedgerSnapshot>,
    guard: FeederGuard,
}

impl LedgerSubscription {
    /// Subscription fed by a sender owned elsewhere (e.g. an in-process store)
    pub fn new(receiver: watch::Receiver<LedgerSnapshot>) -> Self {
        Self {
            receiver,
            guard: FeederGuard(None),
        }
    }

    /// Subscription fed by a dedicated task that is aborted with it
    pub fn with_feeder(receiver: watch::Receiver<LedgerSnapshot>, feeder: JoinHandle<()>) -> Self {
        Self {
            receiver,
            guard: FeederGuard(Some(feeder)),
        }
    }

    /// The latest snapshot
    pub fn current(&self) -> LedgerSnapshot {
        self.receiver.borrow().clone()
    }

    /// Waits for the next snapshot; `None` once the source has closed
    pub async fn changed(&mut self) -> Option<LedgerSnapshot> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Stream of snapshots starting with the current one
    pub fn into_stream(self) -> impl Stream<Item = LedgerSnapshot> + Send + 'static {
        let LedgerSubscription { receiver, guard } = self;
        WatchStream::new(receiver).map(move |snapshot| {
            let _keep_alive = &guard;
            snapshot
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_changed_yields_new_snapshot() {
        let (tx, rx) = watch::channel(Arc::new(Vec::new()));
        let mut subscription = LedgerSubscription::new(rx);
        assert!(subscription.current().is_empty());

        tx.send_replace(Arc::new(Vec::new()));
        assert!(subscription.changed().await.is_some());

        drop(tx);
        assert!(subscription.changed().await.is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_aborts_feeder() {
        let (tx, rx) = watch::channel(Arc::new(Vec::new()));
        let feeder = tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(5)).await;
                tx.send_replace(Arc::new(Vec::new()));
            }
        });
        let probe = feeder.abort_handle();
        let subscription = LedgerSubscription::with_feeder(rx, feeder);

        subscription.unsubscribe();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(probe.is_finished());
    }

    #[tokio::test]
    async fn test_stream_starts_with_current() {
        let (_tx, rx) = watch::channel(Arc::new(Vec::new()));
        let mut stream = Box::pin(LedgerSubscription::new(rx).into_stream());
        let first = stream.next().await;
        assert!(first.is_some());
    }
}
