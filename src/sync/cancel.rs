//! Cooperative cancellation.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a blocking call that observes a [`CancellationToken`].
///
/// Cancellation is an expected way for a wait to end, so it is a value here
/// rather than an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cancellable<T> {
    /// The call ran to completion.
    Done(T),
    /// The token fired before the call could complete.
    Cancelled,
}

impl<T> Cancellable<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Cancellable::Cancelled)
    }

    /// The completed value, if any.
    pub fn done(self) -> Option<T> {
        match self {
            Cancellable::Done(value) => Some(value),
            Cancellable::Cancelled => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Cancellable<U> {
        match self {
            Cancellable::Done(value) => Cancellable::Done(f(value)),
            Cancellable::Cancelled => Cancellable::Cancelled,
        }
    }
}

struct TokenInner {
    cancelled: AtomicBool,
    /// Dropped on cancel, which disconnects `closed` for every waiter at once.
    trigger: Mutex<Option<Sender<()>>>,
    closed: Receiver<()>,
}

/// A cancellation signal shared between the thread that requests cancellation
/// and the threads that wait.
///
/// Clones share the same signal. Cancelling is idempotent. Waiters can block
/// on [`wait_timeout`](Self::wait_timeout) or include
/// [`receiver`](Self::receiver) in a `crossbeam_channel::select!`; the
/// receiver becomes disconnected once the token fires.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (trigger, closed) = bounded::<()>(0);
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                closed,
            }),
        }
    }

    /// Signal cancellation. Returns `true` if this call fired the token.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        drop(self.inner.trigger.lock().take());
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Block until the token fires or `timeout` elapses.
    ///
    /// Returns `true` if the token has fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        match self.inner.closed.recv_timeout(timeout) {
            Err(RecvTimeoutError::Disconnected) => true,
            Ok(()) | Err(RecvTimeoutError::Timeout) => self.is_cancelled(),
        }
    }

    /// Block until the token fires.
    pub fn wait(&self) {
        // Nothing is ever sent; recv only returns once the trigger is dropped.
        let _ = self.inner.closed.recv();
    }

    /// Channel that disconnects when the token fires, for use in `select!`.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.inner.closed
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
