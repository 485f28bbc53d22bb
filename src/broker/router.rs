//! Message routing through a copy-on-write subscription snapshot.
//!
//! The current [`TopicTree`] lives in an atomic cell. Publishers load a
//! snapshot without locking; subscribing clones the tree, mutates the
//! clone and stores it back. Writers are serialized by a mutex so
//! concurrent subscribes cannot lose each other's updates.

use std::sync::Arc;

use arc_swap::ArcSwap;
use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::broker::topic_tree::{Subscriber, TopicTree};
use crate::packet::publish::PublishPacket;

/// Routes publishes to the subscribers matching their topic.
pub struct Router {
    tree: ArcSwap<TopicTree>,
    /// Serializes the load-clone-store sequence of [`Router::subscribe`].
    subscribe_lock: Mutex<()>,
}

impl Router {
    /// Creates a router with an empty subscription tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: ArcSwap::from_pointee(TopicTree::new()),
            subscribe_lock: Mutex::new(()),
        }
    }

    /// Registers `subscriber` under `filter`.
    ///
    /// The cost is a deep copy of the tree; publishers keep reading the
    /// previous snapshot until the store completes.
    pub fn subscribe(&self, filter: &str, subscriber: Arc<dyn Subscriber>) {
        let _guard = self.subscribe_lock.lock();

        let snapshot = self.tree.load();
        let mut next = TopicTree::clone(&snapshot);
        next.subscribe(filter, subscriber);
        self.tree.store(Arc::new(next));
    }

    /// Fans `frame` out to every subscriber matching the publish topic.
    ///
    /// `frame` is the already-encoded outbound PUBLISH; the router never
    /// inspects it. A subscriber whose queue is full or closed is
    /// skipped and the fan-out continues.
    pub fn publish(&self, publish: &PublishPacket, frame: &Bytes) {
        let tree = self.tree.load();
        let subscribers = tree.matches(&publish.topic_name);
        trace!(
            topic = %publish.topic_name,
            matches = subscribers.len(),
            "routing publish"
        );

        for subscriber in subscribers {
            if let Err(e) = subscriber.enqueue(frame.clone()) {
                debug!(
                    subscriber = subscriber.id(),
                    topic = %publish.topic_name,
                    error = %e,
                    "dropping frame for subscriber"
                );
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
