//! Subscription trie keyed by topic level.
//!
//! Filters and topics are split on `/`; every level is a real level,
//! including the empty levels produced by leading, trailing or adjacent
//! slashes, so `a//b` and `a/+/b` match under identical structural
//! conditions. Wildcards are matched only as whole level labels; a
//! label like `foo#` is just a literal that no normal topic level
//! equals.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;

/// Capability handed to the tree for each connected client.
///
/// The contract is deliberately thin: a stable identifier and a
/// non-blocking enqueue of an already-encoded frame.
pub trait Subscriber: Send + Sync {
    /// Stable identifier. At most one entry per id is kept at a given
    /// filter node; re-subscribing overwrites the previous entry.
    fn id(&self) -> &str;

    /// Queues a frame for delivery. Must not block; a full queue
    /// returns [`crate::MqttError::QueueFull`].
    fn enqueue(&self, frame: Bytes) -> Result<()>;
}

#[derive(Clone, Default)]
struct TreeNode {
    children: HashMap<String, TreeNode>,
    subs: HashMap<String, Arc<dyn Subscriber>>,
}

impl TreeNode {
    fn insert(&mut self, levels: &[&str], subscriber: Arc<dyn Subscriber>) {
        match levels.split_first() {
            None => {
                self.subs.insert(subscriber.id().to_string(), subscriber);
            }
            Some((level, rest)) => {
                self.children
                    .entry((*level).to_string())
                    .or_default()
                    .insert(rest, subscriber);
            }
        }
    }

    fn collect_matches(&self, levels: &[&str], out: &mut Vec<Arc<dyn Subscriber>>) {
        // A `#` child matches the rest of the topic from here,
        // including the empty rest; only its direct subscribers are
        // emitted, never its own children.
        if let Some(hash) = self.children.get("#") {
            out.extend(hash.subs.values().cloned());
        }

        match levels.split_first() {
            None => out.extend(self.subs.values().cloned()),
            Some((level, rest)) => {
                if let Some(child) = self.children.get(*level) {
                    child.collect_matches(rest, out);
                }
                if let Some(child) = self.children.get("+") {
                    child.collect_matches(rest, out);
                }
            }
        }
    }
}

/// Mapping from subscription filter to subscribers.
///
/// A tree published to the router is never mutated again: `clone`
/// produces a structurally independent copy (subscriber handles are
/// shared by reference), the copy is mutated, and the copy replaces the
/// original.
#[derive(Clone, Default)]
pub struct TopicTree {
    root: TreeNode,
}

impl TopicTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `subscriber` under `filter`, creating intermediate nodes as
    /// needed.
    pub fn subscribe(&mut self, filter: &str, subscriber: Arc<dyn Subscriber>) {
        let levels: Vec<&str> = filter.split('/').collect();
        self.root.insert(&levels, subscriber);
    }

    /// Returns every subscriber whose filter matches `topic`.
    ///
    /// A subscriber appears once per matching filter, so distinct
    /// filters of the same client yield duplicate entries. Order is
    /// unspecified.
    #[must_use]
    pub fn matches(&self, topic: &str) -> Vec<Arc<dyn Subscriber>> {
        let levels: Vec<&str> = topic.split('/').collect();
        let mut out = Vec::new();
        self.root.collect_matches(&levels, &mut out);
        out
    }
}
