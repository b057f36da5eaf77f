//! Error types for event feed operations.

use crate::subscriptions::SubscriptionId;
use crate::types::Checkpoint;
use thiserror::Error;

/// Main error type for feed and subscription operations.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Subscription already started")]
    AlreadyStarted,

    #[error("Subscription has been disposed")]
    ObjectDisposed,

    #[error("Subscription {0} is already registered")]
    DuplicateSubscription(SubscriptionId),

    #[error("Event source error: {0}")]
    Source(String),

    #[error("Observer error: {0}")]
    Observer(String),

    #[error("Checkpoint regressed: page ends at {next:?} but subscription is at {current:?}")]
    CheckpointRegression {
        current: Checkpoint,
        next: Checkpoint,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::Serialization(e.to_string())
    }
}

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
