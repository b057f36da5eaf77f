//! In-memory event store.

use crate::error::Result;
use crate::sync::{Cancellable, CancellationToken};
use crate::types::{Checkpoint, EventInput, Page, Timestamp, Transaction, TransactionId};
use crossbeam_channel::{bounded, select, Sender};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::trace;

use super::EventSource;

/// Configuration for [`MemoryEventStore`].
#[derive(Clone, Debug)]
pub struct MemoryStoreConfig {
    /// Max transactions returned per page.
    /// Default: 100
    pub max_page_size: usize,

    /// How often a waiting fetch rechecks the log when nothing wakes it.
    /// Appends and cancellation wake waiting fetches immediately.
    /// Default: 50ms
    pub poll_interval: Duration,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// An append-only transaction log held in memory.
///
/// Checkpoints are assigned on append, starting at 1, so `None` and any
/// checkpoint below 1 both mean "from the beginning".
pub struct MemoryEventStore {
    config: MemoryStoreConfig,
    transactions: Mutex<Vec<Transaction>>,
    /// Fetches parked until the next append.
    waiters: Mutex<Vec<Sender<()>>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            config,
            transactions: Mutex::new(Vec::new()),
            waiters: Mutex::new(Vec::new()),
        }
    }

    /// Commit `events` to `stream_id` as one transaction.
    pub fn append(&self, stream_id: impl Into<String>, events: Vec<EventInput>) -> Transaction {
        let mut txs = self.transactions.lock();

        let checkpoint = txs
            .last()
            .map(|t| t.checkpoint.next())
            .unwrap_or(Checkpoint(1));

        let transaction = Transaction {
            id: TransactionId(checkpoint.0),
            stream_id: stream_id.into(),
            checkpoint,
            timestamp: Timestamp::now(),
            events: events.into_iter().map(EventInput::into_event).collect(),
        };
        txs.push(transaction.clone());
        let waiters = std::mem::take(&mut *self.waiters.lock());
        drop(txs);

        for waiter in waiters {
            let _ = waiter.try_send(());
        }
        transaction
    }

    /// Number of committed transactions.
    pub fn len(&self) -> usize {
        self.transactions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checkpoint of the most recent transaction.
    pub fn head(&self) -> Option<Checkpoint> {
        self.transactions.lock().last().map(|t| t.checkpoint)
    }

    /// Transactions strictly after `checkpoint`, at most `limit` of them.
    fn read_after(txs: &[Transaction], checkpoint: Option<Checkpoint>, limit: usize) -> &[Transaction] {
        let start = match checkpoint {
            Some(cp) => txs.partition_point(|t| t.checkpoint <= cp),
            None => 0,
        };
        let end = (start + limit.max(1)).min(txs.len());
        &txs[start..end]
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for MemoryEventStore {
    fn fetch_next_page(
        &self,
        checkpoint: Option<Checkpoint>,
        cancel: &CancellationToken,
    ) -> Result<Cancellable<Page>> {
        let (wake_tx, wake_rx) = bounded(1);
        let mut parked = false;

        loop {
            {
                let txs = self.transactions.lock();
                if cancel.is_cancelled() {
                    return Ok(Cancellable::Cancelled);
                }

                let batch = Self::read_after(&txs, checkpoint, self.config.max_page_size);
                if let Some(last) = batch.last() {
                    trace!(
                        from = ?checkpoint,
                        to = ?last.checkpoint,
                        count = batch.len(),
                        "serving page"
                    );
                    return Ok(Cancellable::Done(Page::new(batch.to_vec(), last.checkpoint)));
                }

                // Registered under the log lock so no append can slip in between.
                if !parked {
                    self.waiters.lock().push(wake_tx.clone());
                    parked = true;
                }
            }

            select! {
                recv(cancel.receiver()) -> _ => {}
                recv(wake_rx) -> _ => parked = false,
                default(self.config.poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn event(n: u32) -> EventInput {
        EventInput::json("counted", &json!({ "n": n })).unwrap()
    }

    #[test]
    fn test_append_assigns_increasing_checkpoints() {
        let store = MemoryEventStore::new();
        assert!(store.is_empty());
        assert_eq!(store.head(), None);

        let first = store.append("orders-1", vec![event(1)]);
        let second = store.append("orders-2", vec![event(2), event(3)]);

        assert_eq!(first.checkpoint, Checkpoint(1));
        assert_eq!(second.checkpoint, Checkpoint(2));
        assert_eq!(second.events.len(), 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.head(), Some(Checkpoint(2)));
    }

    #[test]
    fn test_pages_respect_max_page_size() {
        let store = MemoryEventStore::with_config(MemoryStoreConfig {
            max_page_size: 2,
            ..Default::default()
        });
        for i in 0..5 {
            store.append("s", vec![event(i)]);
        }
        let token = CancellationToken::new();

        let page = store.fetch_next_page(None, &token).unwrap().done().unwrap();
        assert_eq!(page.transactions.len(), 2);
        assert_eq!(page.checkpoint, Checkpoint(2));

        let page = store
            .fetch_next_page(Some(page.checkpoint), &token)
            .unwrap()
            .done()
            .unwrap();
        assert_eq!(page.checkpoint, Checkpoint(4));

        let page = store
            .fetch_next_page(Some(page.checkpoint), &token)
            .unwrap()
            .done()
            .unwrap();
        assert_eq!(page.transactions.len(), 1);
        assert_eq!(page.checkpoint, Checkpoint(5));
    }

    #[test]
    fn test_fetch_waits_for_append() {
        let store = Arc::new(MemoryEventStore::new());
        let token = CancellationToken::new();

        let reader = {
            let store = Arc::clone(&store);
            let token = token.clone();
            thread::spawn(move || store.fetch_next_page(None, &token).unwrap())
        };

        thread::sleep(Duration::from_millis(30));
        store.append("s", vec![event(1)]);

        let page = reader.join().unwrap().done().unwrap();
        assert_eq!(page.checkpoint, Checkpoint(1));
    }

    #[test]
    fn test_cancel_interrupts_waiting_fetch() {
        let store = Arc::new(MemoryEventStore::with_config(MemoryStoreConfig {
            poll_interval: Duration::from_millis(10),
            ..Default::default()
        }));
        let token = CancellationToken::new();

        let reader = {
            let store = Arc::clone(&store);
            let token = token.clone();
            thread::spawn(move || {
                let started = Instant::now();
                let result = store.fetch_next_page(None, &token).unwrap();
                (result, started.elapsed())
            })
        };

        thread::sleep(Duration::from_millis(30));
        token.cancel();

        let (result, elapsed) = reader.join().unwrap();
        assert!(result.is_cancelled());
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_cancel_wakes_fetch_before_poll_interval() {
        let store = Arc::new(MemoryEventStore::with_config(MemoryStoreConfig {
            poll_interval: Duration::from_secs(30),
            ..Default::default()
        }));
        let token = CancellationToken::new();

        let reader = {
            let store = Arc::clone(&store);
            let token = token.clone();
            thread::spawn(move || {
                let result = store.fetch_next_page(None, &token).unwrap();
                (result, Instant::now())
            })
        };

        thread::sleep(Duration::from_millis(30));
        let cancelled_at = Instant::now();
        token.cancel();

        let (result, returned_at) = reader.join().unwrap();
        assert!(result.is_cancelled());
        assert!(returned_at.duration_since(cancelled_at) < Duration::from_secs(2));
    }

    #[test]
    fn test_append_wakes_fetch_before_poll_interval() {
        let store = Arc::new(MemoryEventStore::with_config(MemoryStoreConfig {
            poll_interval: Duration::from_secs(30),
            ..Default::default()
        }));
        let token = CancellationToken::new();

        let reader = {
            let store = Arc::clone(&store);
            let token = token.clone();
            thread::spawn(move || {
                let started = Instant::now();
                let result = store.fetch_next_page(None, &token).unwrap();
                (result, started.elapsed())
            })
        };

        thread::sleep(Duration::from_millis(30));
        store.append("s", vec![event(1)]);

        let (result, elapsed) = reader.join().unwrap();
        assert_eq!(result.done().unwrap().checkpoint, Checkpoint(1));
        assert!(elapsed < Duration::from_secs(2));
        assert!(store.waiters.lock().is_empty());
    }

    #[test]
    fn test_cancelled_token_wins_over_available_data() {
        let store = MemoryEventStore::new();
        store.append("s", vec![event(1)]);
        let token = CancellationToken::new();
        token.cancel();

        let result = store.fetch_next_page(None, &token).unwrap();
        assert!(result.is_cancelled());
    }
}
