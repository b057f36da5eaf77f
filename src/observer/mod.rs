//! Observers: the per-page callbacks subscriptions deliver to.
//!
//! Implement [`Observer`] for full control (including reacting to
//! cancellation while a page is being processed), or wrap a closure with
//! [`from_fn`] when the handler just needs the transactions.
//!
//! Any error an observer returns halts the subscription that called it.

mod channel;

pub use channel::ChannelObserver;

use crate::sync::{Cancellable, CancellationToken};
use crate::types::Transaction;

/// Boxed error returned by observers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of delivering one page to an observer.
pub type ObserveResult = std::result::Result<Cancellable<()>, BoxError>;

/// Handles the transactions of each page a subscription fetches.
pub trait Observer: Send + Sync + 'static {
    /// Process one page worth of transactions, in order.
    ///
    /// May block. Long-running observers should watch `cancel` and return
    /// [`Cancellable::Cancelled`] once it fires; the page is then treated as
    /// not delivered and the checkpoint does not advance.
    fn observe(&self, transactions: &[Transaction], cancel: &CancellationToken) -> ObserveResult;
}

/// Adapter that wraps a closure into an [`Observer`].
pub struct FnObserver<F>(F);

impl<F> Observer for FnObserver<F>
where
    F: Fn(&[Transaction]) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
{
    fn observe(&self, transactions: &[Transaction], _cancel: &CancellationToken) -> ObserveResult {
        (self.0)(transactions).map(Cancellable::Done)
    }
}

/// Build an observer from a closure.
///
/// ```ignore
/// let observer = observer::from_fn(|txs| {
///     println!("{} transactions", txs.len());
///     Ok(())
/// });
/// ```
pub fn from_fn<F>(f: F) -> FnObserver<F>
where
    F: Fn(&[Transaction]) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
{
    FnObserver(f)
}
