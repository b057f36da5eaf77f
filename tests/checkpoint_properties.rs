//! Property tests for checkpoint progression.

use event_feed::{ChannelObserver, Checkpoint, EventFeed, EventInput, MemoryEventStore, MemoryStoreConfig};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Every transaction after the starting checkpoint is delivered exactly
    /// once, in order, regardless of page size.
    #[test]
    fn prop_delivery_is_ordered_and_complete(
        tx_count in 1u64..40,
        page_size in 1usize..8,
        start in proptest::option::of(0u64..40),
    ) {
        let store = Arc::new(MemoryEventStore::with_config(MemoryStoreConfig {
            max_page_size: page_size,
            poll_interval: Duration::from_millis(2),
        }));
        for i in 0..tx_count {
            store.append("s", vec![EventInput::raw("e", i.to_le_bytes().to_vec())]);
        }

        let start = start.map(|s| Checkpoint(s.min(tx_count)));
        let first = start.map(|c| c.0 + 1).unwrap_or(1);
        let expected: Vec<Checkpoint> = (first..=tx_count).map(Checkpoint).collect();

        let feed = EventFeed::new(store);
        let (observer, pages) = ChannelObserver::bounded(64);
        let sub = feed.subscribe(start, Arc::new(observer)).unwrap();

        let mut delivered = Vec::new();
        while delivered.len() < expected.len() {
            let page = pages.recv_timeout(Duration::from_secs(5)).unwrap();
            prop_assert!(!page.is_empty());
            prop_assert!(page.len() <= page_size);
            delivered.extend(page.iter().map(|t| t.checkpoint));
        }
        sub.dispose();

        prop_assert_eq!(&delivered, &expected);
        prop_assert!(delivered.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(sub.checkpoint(), expected.last().copied().or(start));
    }
}
