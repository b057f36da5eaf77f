//! Subscription types.

use crate::types::Checkpoint;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Unique identifier for a subscription.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Configuration for a subscription.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionConfig {
    /// Starting checkpoint (None = from the beginning).
    pub from_checkpoint: Option<Checkpoint>,

    /// Name of the polling thread.
    /// Default: `event-feed-<id>`
    pub thread_name: Option<String>,
}

impl SubscriptionConfig {
    /// Start after `checkpoint`.
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Self {
        Self {
            from_checkpoint: Some(checkpoint),
            ..Default::default()
        }
    }
}

/// Lifecycle of a subscription.
///
/// `Disposed` is terminal. A subscription whose loop halted on a fatal error
/// still reads `Running` until it is disposed; use
/// [`Subscription::exit_status`](super::Subscription::exit_status) to detect
/// a dead loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    Created,
    Running,
    Disposed,
}

/// Why a polling loop stopped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum LoopExit {
    /// The subscription was cancelled (disposed).
    Cancelled,
    /// Fetch or observer failed; the subscription is halted for good.
    Failed { error: String },
}

impl LoopExit {
    pub fn is_failure(&self) -> bool {
        matches!(self, LoopExit::Failed { .. })
    }
}

/// Point-in-time view of a subscription.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubscriptionStats {
    pub id: SubscriptionId,
    pub state: SubscriptionState,
    /// Last checkpoint delivered (or the starting one).
    pub checkpoint: Option<Checkpoint>,
    pub pages_delivered: u64,
    pub transactions_delivered: u64,
    /// Set once the polling loop has stopped.
    pub exit: Option<LoopExit>,
}

/// Exit status written once by the polling thread.
#[derive(Default)]
pub(crate) struct ExitSignal {
    exit: Mutex<Option<LoopExit>>,
    finished: Condvar,
}

impl ExitSignal {
    pub(crate) fn finish(&self, exit: LoopExit) {
        let mut slot = self.exit.lock();
        if slot.is_none() {
            *slot = Some(exit);
        }
        drop(slot);
        self.finished.notify_all();
    }

    pub(crate) fn get(&self) -> Option<LoopExit> {
        self.exit.lock().clone()
    }

    pub(crate) fn wait_timeout(&self, timeout: Duration) -> Option<LoopExit> {
        let mut slot = self.exit.lock();
        if slot.is_none() {
            self.finished
                .wait_while_for(&mut slot, |exit| exit.is_none(), timeout);
        }
        slot.clone()
    }
}
