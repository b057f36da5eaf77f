//! Event sources: where subscriptions pull pages from.
//!
//! A source answers "give me everything after checkpoint X", blocking until
//! there is something to return or the caller's token fires. How it batches
//! and how often it polls its backing store are its own business.

mod memory;

pub use memory::{MemoryEventStore, MemoryStoreConfig};

use crate::error::Result;
use crate::sync::{Cancellable, CancellationToken};
use crate::types::{Checkpoint, Page};

/// Supplies pages of transactions to subscriptions.
pub trait EventSource: Send + Sync {
    /// Fetch the next page after `checkpoint` (`None` = from the beginning).
    ///
    /// Implementations may block while no data is available but must return
    /// [`Cancellable::Cancelled`] promptly once `cancel` fires.
    fn fetch_next_page(
        &self,
        checkpoint: Option<Checkpoint>,
        cancel: &CancellationToken,
    ) -> Result<Cancellable<Page>>;
}
