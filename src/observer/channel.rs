//! Observer that hands pages to another thread over a bounded channel.

use crossbeam_channel::{bounded, select, Receiver, Sender};

use super::{BoxError, ObserveResult, Observer};
use crate::sync::{Cancellable, CancellationToken};
use crate::types::Transaction;

/// Forwards each page's transactions into a bounded channel.
///
/// A full channel blocks the subscription loop until the consumer catches up
/// or the subscription is cancelled. A dropped receiver is an observer
/// failure, which halts the subscription.
pub struct ChannelObserver {
    sender: Sender<Vec<Transaction>>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its channel.
    pub fn bounded(capacity: usize) -> (Self, Receiver<Vec<Transaction>>) {
        let (sender, receiver) = bounded(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl Observer for ChannelObserver {
    fn observe(&self, transactions: &[Transaction], cancel: &CancellationToken) -> ObserveResult {
        let batch = transactions.to_vec();
        select! {
            send(self.sender, batch) -> sent => match sent {
                Ok(()) => Ok(Cancellable::Done(())),
                Err(_) => Err(BoxError::from("page receiver disconnected")),
            },
            recv(cancel.receiver()) -> _ => Ok(Cancellable::Cancelled),
        }
    }
}
