//! A checkpointed polling subscription.

use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, trace, warn};

use super::registry::SubscriptionRegistry;
use super::types::{
    ExitSignal, LoopExit, SubscriptionConfig, SubscriptionId, SubscriptionState, SubscriptionStats,
};
use crate::error::{FeedError, Result};
use crate::observer::Observer;
use crate::source::EventSource;
use crate::sync::{Cancellable, CancellationToken, OnceFlag};
use crate::types::Checkpoint;

/// Lifecycle fields, only touched inside short critical sections.
struct Lifecycle {
    state: SubscriptionState,
    /// Whether a polling thread was ever spawned. Never reset.
    started: bool,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

/// State shared with the polling thread.
struct LoopShared {
    id: SubscriptionId,
    source: Arc<dyn EventSource>,
    observer: Arc<dyn Observer>,
    /// Written only by the polling thread.
    checkpoint: RwLock<Option<Checkpoint>>,
    pages_delivered: AtomicU64,
    transactions_delivered: AtomicU64,
    exit: ExitSignal,
}

/// Repeatedly pulls pages from an [`EventSource`], hands them to an
/// [`Observer`] and advances its checkpoint after each delivered page.
///
/// The loop runs on a dedicated thread created by [`start`](Self::start).
/// Fetch or observer failures stop the loop for good: there is no retry, and
/// the owner is expected to notice via [`exit_status`](Self::exit_status) and
/// resubscribe from [`checkpoint`](Self::checkpoint) if it wants to.
///
/// [`dispose`](Self::dispose) may be called from any thread, any number of
/// times, before or after `start`. It blocks until the polling thread has
/// exited, with no timeout: an observer that never returns blocks disposal
/// forever.
pub struct Subscription {
    id: SubscriptionId,
    thread_name: String,
    shared: Arc<LoopShared>,
    lifecycle: Mutex<Lifecycle>,
    disposed: OnceFlag,
    registry: Weak<SubscriptionRegistry>,
}

impl Subscription {
    /// Create a subscription. Nothing runs until [`start`](Self::start).
    pub fn new(
        id: SubscriptionId,
        config: SubscriptionConfig,
        source: Arc<dyn EventSource>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        let thread_name = config
            .thread_name
            .unwrap_or_else(|| format!("event-feed-{}", id.0));

        Self {
            id,
            thread_name,
            shared: Arc::new(LoopShared {
                id,
                source,
                observer,
                checkpoint: RwLock::new(config.from_checkpoint),
                pages_delivered: AtomicU64::new(0),
                transactions_delivered: AtomicU64::new(0),
                exit: ExitSignal::default(),
            }),
            lifecycle: Mutex::new(Lifecycle {
                state: SubscriptionState::Created,
                started: false,
                cancel: None,
                handle: None,
            }),
            disposed: OnceFlag::new(),
            registry: Weak::new(),
        }
    }

    /// Deregister from `registry` on teardown.
    ///
    /// The subscription never adds itself; the owner does that.
    pub fn with_registry(mut self, registry: &Arc<SubscriptionRegistry>) -> Self {
        self.registry = Arc::downgrade(registry);
        self
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn state(&self) -> SubscriptionState {
        self.lifecycle.lock().state
    }

    /// Last delivered checkpoint, or the starting one if nothing was delivered.
    ///
    /// Updated by the polling thread; other threads may see a slightly stale
    /// value.
    pub fn checkpoint(&self) -> Option<Checkpoint> {
        self.shared.checkpoint()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.is_set()
    }

    /// Whether the polling loop has stopped, for whatever reason.
    pub fn is_finished(&self) -> bool {
        self.shared.exit.get().is_some()
    }

    /// Why the polling loop stopped, if it has.
    pub fn exit_status(&self) -> Option<LoopExit> {
        self.shared.exit.get()
    }

    /// Block until the polling loop stops or `timeout` elapses.
    pub fn wait_for_exit(&self, timeout: Duration) -> Option<LoopExit> {
        self.shared.exit.wait_timeout(timeout)
    }

    pub fn stats(&self) -> SubscriptionStats {
        SubscriptionStats {
            id: self.id,
            state: self.state(),
            checkpoint: self.checkpoint(),
            pages_delivered: self.shared.pages_delivered.load(Ordering::Relaxed),
            transactions_delivered: self.shared.transactions_delivered.load(Ordering::Relaxed),
            exit: self.exit_status(),
        }
    }

    /// Spawn the polling thread.
    ///
    /// Fails with [`FeedError::AlreadyStarted`] on any call after the first
    /// successful one, and with [`FeedError::ObjectDisposed`] once disposal
    /// has begun.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();

        if lifecycle.started {
            return Err(FeedError::AlreadyStarted);
        }
        if lifecycle.state == SubscriptionState::Disposed || self.disposed.is_set() {
            return Err(FeedError::ObjectDisposed);
        }

        let cancel = CancellationToken::new();
        let shared = Arc::clone(&self.shared);
        let loop_cancel = cancel.clone();
        let handle = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || shared.run(loop_cancel))?;

        lifecycle.cancel = Some(cancel);
        lifecycle.handle = Some(handle);
        lifecycle.started = true;
        lifecycle.state = SubscriptionState::Running;

        debug!(
            subscription = %self.id,
            checkpoint = ?self.shared.checkpoint(),
            thread = %self.thread_name,
            "subscription started"
        );
        Ok(())
    }

    /// Same as [`dispose`](Self::dispose).
    pub fn complete(&self) {
        self.dispose();
    }

    /// Cancel the polling loop, wait for it to exit and deregister.
    ///
    /// Only the first call does anything; concurrent and later calls return
    /// immediately. Must not be called from inside the observer: the join is
    /// skipped in that case and the loop exits once the observer returns.
    pub fn dispose(&self) {
        if !self.disposed.ensure_called_once() {
            return;
        }

        let (cancel, handle) = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.state = SubscriptionState::Disposed;
            (lifecycle.cancel.take(), lifecycle.handle.take())
        };

        if let Some(cancel) = &cancel {
            if !cancel.is_cancelled() {
                cancel.cancel();
            }
        }

        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                warn!(
                    subscription = %self.id,
                    "dispose called from the polling thread; not waiting for it to exit"
                );
            } else if handle.join().is_err() {
                error!(subscription = %self.id, "polling thread panicked");
            }
        }

        drop(cancel);

        if let Some(registry) = self.registry.upgrade() {
            registry.deregister(self);
        }

        debug!(
            subscription = %self.id,
            checkpoint = ?self.shared.checkpoint(),
            "subscription disposed"
        );
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("checkpoint", &self.checkpoint())
            .finish()
    }
}

impl LoopShared {
    fn checkpoint(&self) -> Option<Checkpoint> {
        *self.checkpoint.read()
    }

    /// Body of the polling thread.
    fn run(&self, cancel: CancellationToken) {
        debug!(subscription = %self.id, checkpoint = ?self.checkpoint(), "polling loop started");

        let exit = match self.poll(&cancel) {
            Ok(()) => {
                debug!(subscription = %self.id, "polling loop cancelled");
                LoopExit::Cancelled
            }
            Err(err) => {
                error!(
                    subscription = %self.id,
                    checkpoint = ?self.checkpoint(),
                    error = %err,
                    "event polling loop failed; subscription halted"
                );
                LoopExit::Failed {
                    error: err.to_string(),
                }
            }
        };

        self.exit.finish(exit);
    }

    /// Fetch, deliver, advance until cancelled. Any error is fatal.
    fn poll(&self, cancel: &CancellationToken) -> Result<()> {
        while !cancel.is_cancelled() {
            let checkpoint = self.checkpoint();

            let fetched = guard(|| self.source.fetch_next_page(checkpoint, cancel))
                .map_err(|msg| FeedError::Source(format!("fetch panicked: {msg}")))??;
            let page = match fetched {
                Cancellable::Done(page) => page,
                Cancellable::Cancelled if cancel.is_cancelled() => return Ok(()),
                Cancellable::Cancelled => {
                    return Err(FeedError::Source(
                        "fetch returned Cancelled without a cancel request".to_string(),
                    ))
                }
            };

            // The token may have fired while the fetch was returning.
            if cancel.is_cancelled() {
                return Ok(());
            }

            if let Some(current) = checkpoint {
                if page.checkpoint < current {
                    return Err(FeedError::CheckpointRegression {
                        current,
                        next: page.checkpoint,
                    });
                }
            }

            let observed = guard(|| self.observer.observe(&page.transactions, cancel))
                .map_err(|msg| FeedError::Observer(format!("observer panicked: {msg}")))?
                .map_err(|e| FeedError::Observer(e.to_string()))?;
            if observed.is_cancelled() {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                return Err(FeedError::Observer(
                    "observer returned Cancelled without a cancel request".to_string(),
                ));
            }

            self.pages_delivered.fetch_add(1, Ordering::Relaxed);
            self.transactions_delivered
                .fetch_add(page.transactions.len() as u64, Ordering::Relaxed);
            *self.checkpoint.write() = Some(page.checkpoint);

            trace!(
                subscription = %self.id,
                checkpoint = ?page.checkpoint,
                transactions = page.transactions.len(),
                "page delivered"
            );
        }

        Ok(())
    }
}

/// Run `f`, turning a panic into its message.
fn guard<T>(f: impl FnOnce() -> T) -> std::result::Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(panic_message)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
