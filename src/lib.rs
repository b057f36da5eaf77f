//! # Event Feed
//!
//! Checkpointed polling subscriptions over an ordered event store.
//!
//! ## Core Concepts
//!
//! - **Checkpoints**: Opaque, ordered positions in the event stream
//! - **Pages**: Batches of transactions ending at a checkpoint
//! - **Subscriptions**: Background loops that fetch pages, deliver them to an
//!   observer and advance their checkpoint
//! - **Registry**: Every live subscription, under one lock
//!
//! ## Example
//!
//! ```ignore
//! use event_feed::{observer, EventFeed, EventInput, MemoryEventStore};
//!
//! let store = Arc::new(MemoryEventStore::new());
//! let feed = EventFeed::new(store.clone());
//!
//! let sub = feed.subscribe(None, Arc::new(observer::from_fn(|txs| {
//!     for tx in txs {
//!         println!("{}: {} events", tx.checkpoint, tx.events.len());
//!     }
//!     Ok(())
//! })))?;
//!
//! store.append("orders-42", vec![EventInput::json("order-placed", &json!({"total": 12}))?]);
//!
//! // Stop polling; blocks until the loop has exited.
//! sub.dispose();
//! ```

pub mod error;
pub mod feed;
pub mod observer;
pub mod source;
pub mod subscriptions;
pub mod sync;
pub mod types;

// Re-exports
pub use error::{FeedError, Result};
pub use feed::{EventFeed, FeedConfig};
pub use observer::{BoxError, ChannelObserver, ObserveResult, Observer};
pub use source::{EventSource, MemoryEventStore, MemoryStoreConfig};
pub use subscriptions::{
    LoopExit, RegistryStats, Subscription, SubscriptionConfig, SubscriptionId,
    SubscriptionRegistry, SubscriptionState, SubscriptionStats,
};
pub use sync::{Cancellable, CancellationToken, OnceFlag};
pub use types::*;
