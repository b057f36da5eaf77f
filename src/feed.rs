//! EventFeed: creates, registers and starts subscriptions over one source.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{FeedError, Result};
use crate::observer::Observer;
use crate::source::EventSource;
use crate::subscriptions::{
    RegistryStats, Subscription, SubscriptionConfig, SubscriptionId, SubscriptionRegistry,
};
use crate::types::Checkpoint;

/// Feed configuration.
#[derive(Clone, Debug)]
pub struct FeedConfig {
    /// Prefix for polling thread names; the subscription id is appended.
    pub thread_name_prefix: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "event-feed".to_string(),
        }
    }
}

/// Owns an event source and every subscription reading from it.
///
/// Dropping the feed disposes all subscriptions still registered.
pub struct EventFeed {
    config: FeedConfig,
    source: Arc<dyn EventSource>,
    registry: Arc<SubscriptionRegistry>,
    next_id: AtomicU64,
}

impl EventFeed {
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self::with_config(source, FeedConfig::default())
    }

    pub fn with_config(source: Arc<dyn EventSource>, config: FeedConfig) -> Self {
        Self {
            config,
            source,
            registry: Arc::new(SubscriptionRegistry::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe `observer` to every transaction after `checkpoint`
    /// (`None` = from the beginning).
    ///
    /// The returned subscription is already running and registered; dispose
    /// it to stop.
    pub fn subscribe(
        &self,
        checkpoint: Option<Checkpoint>,
        observer: Arc<dyn Observer>,
    ) -> Result<Arc<Subscription>> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let config = SubscriptionConfig {
            from_checkpoint: checkpoint,
            thread_name: Some(format!("{}-{}", self.config.thread_name_prefix, id.0)),
        };

        let subscription = Arc::new(
            Subscription::new(id, config, Arc::clone(&self.source), observer)
                .with_registry(&self.registry),
        );
        if !self.registry.add(Arc::clone(&subscription)) {
            warn!(subscription = %id, "subscription id already registered; not starting");
            return Err(FeedError::DuplicateSubscription(id));
        }

        if let Err(e) = subscription.start() {
            subscription.dispose();
            return Err(e);
        }

        debug!(subscription = %id, checkpoint = ?checkpoint, "subscribed");
        Ok(subscription)
    }

    pub fn get(&self, id: SubscriptionId) -> Option<Arc<Subscription>> {
        self.registry.get(id)
    }

    /// Number of live (not yet disposed) subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.registry.len()
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    /// Dispose every registered subscription, waiting for each loop to exit.
    pub fn dispose_all(&self) {
        let subscriptions = self.registry.snapshot();
        if subscriptions.is_empty() {
            return;
        }

        info!(count = subscriptions.len(), "disposing subscriptions");
        for subscription in subscriptions {
            subscription.dispose();
        }
    }
}

impl Drop for EventFeed {
    fn drop(&mut self) {
        self.dispose_all();
    }
}
