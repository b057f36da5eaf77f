//! Checkpointed polling subscriptions.
//!
//! A [`Subscription`] owns one dedicated thread that repeatedly:
//! - fetches the next page after its checkpoint from an event source
//! - hands the page's transactions to its observer
//! - advances the checkpoint once the observer returns
//!
//! Subscriptions support:
//! - Resuming from any checkpoint
//! - Cancellation and disposal from any thread, with exactly-once teardown
//! - Deregistering from a shared [`SubscriptionRegistry`]
//!
//! Failures are not retried. A halted subscription reports why through
//! [`Subscription::exit_status`].
//!
//! # Example
//!
//! ```ignore
//! let registry = Arc::new(SubscriptionRegistry::new());
//! let sub = Arc::new(
//!     Subscription::new(
//!         SubscriptionId(1),
//!         SubscriptionConfig::from_checkpoint(Checkpoint(100)),
//!         store.clone(),
//!         Arc::new(observer::from_fn(|txs| {
//!             println!("{} transactions", txs.len());
//!             Ok(())
//!         })),
//!     )
//!     .with_registry(&registry),
//! );
//! registry.add(Arc::clone(&sub));
//! sub.start()?;
//!
//! // Later, from any thread:
//! sub.dispose();
//! ```

mod registry;
mod subscription;
mod types;

pub use registry::{RegistryStats, SubscriptionRegistry};
pub use subscription::Subscription;
pub use types::{
    LoopExit, SubscriptionConfig, SubscriptionId, SubscriptionState, SubscriptionStats,
};
