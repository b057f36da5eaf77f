//! Registry of live subscriptions.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::subscription::Subscription;
use super::types::SubscriptionId;

/// Registry counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Subscriptions currently registered.
    pub active: usize,
    /// Total subscriptions ever added.
    pub registered: u64,
    /// Total subscriptions removed.
    pub removed: u64,
}

/// Tracks every live subscription under one lock.
///
/// Owners add subscriptions; a subscription removes itself while tearing
/// down. The lock is only held for map operations, never while a
/// subscription is being started or disposed.
pub struct SubscriptionRegistry {
    subscriptions: Mutex<HashMap<SubscriptionId, Arc<Subscription>>>,
    registered: AtomicU64,
    removed: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(HashMap::new()),
            registered: AtomicU64::new(0),
            removed: AtomicU64::new(0),
        }
    }

    /// Register a subscription. Returns false if the id was already present.
    pub fn add(&self, subscription: Arc<Subscription>) -> bool {
        let mut subs = self.subscriptions.lock();
        if subs.contains_key(&subscription.id()) {
            return false;
        }
        subs.insert(subscription.id(), subscription);
        self.registered.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Remove a subscription, returning it if it was registered.
    pub fn remove(&self, id: SubscriptionId) -> Option<Arc<Subscription>> {
        let removed = self.subscriptions.lock().remove(&id);
        if removed.is_some() {
            self.removed.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Remove `subscription` only if it is the entry registered under its id.
    ///
    /// A subscription that lost an `add` race for its id must not evict the
    /// registered one when it is torn down.
    pub(crate) fn deregister(&self, subscription: &Subscription) -> bool {
        let mut subs = self.subscriptions.lock();
        match subs.get(&subscription.id()) {
            Some(existing) if std::ptr::eq(Arc::as_ptr(existing), subscription) => {
                subs.remove(&subscription.id());
                self.removed.fetch_add(1, Ordering::Relaxed);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: SubscriptionId) -> Option<Arc<Subscription>> {
        self.subscriptions.lock().get(&id).cloned()
    }

    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.subscriptions.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone out every registered subscription.
    ///
    /// Callers that dispose subscriptions must work from a snapshot: disposal
    /// takes the registry lock to deregister.
    pub fn snapshot(&self) -> Vec<Arc<Subscription>> {
        self.subscriptions.lock().values().cloned().collect()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            active: self.len(),
            registered: self.registered.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
        }
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
