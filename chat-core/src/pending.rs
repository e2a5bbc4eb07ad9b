//! Offline pending queue for relaychat.
//!
//! Holds messages the relay accepted while their recipient was not
//! registered. Each recipient has its own FIFO list, created on first use
//! and removed entirely when drained.
//!
//! Delivery from this queue is at-most-once: a drain hands everything to
//! the caller and forgets it, so items lost after the drain are not
//! re-enqueued.

use std::collections::{HashMap, VecDeque};

/// Per-recipient ordered buffer of undelivered messages.
#[derive(Debug, Clone)]
pub struct PendingQueue<M> {
    queues: HashMap<String, VecDeque<M>>,
}

impl<M> PendingQueue<M> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            queues: HashMap::new(),
        }
    }

    /// Append `message` to the tail of `phone`'s list.
    pub fn enqueue(&mut self, phone: &str, message: M) {
        self.queues
            .entry(phone.to_string())
            .or_default()
            .push_back(message);
    }

    /// Take every message queued for `phone`, in enqueue order.
    ///
    /// The list is emptied in the same step; there are no partial drains.
    pub fn drain_and_clear(&mut self, phone: &str) -> Vec<M> {
        self.queues
            .remove(phone)
            .map(Vec::from)
            .unwrap_or_default()
    }

    /// Number of messages waiting for `phone`.
    pub fn pending_count(&self, phone: &str) -> usize {
        self.queues.get(phone).map_or(0, VecDeque::len)
    }

    /// Number of messages waiting across all recipients.
    pub fn total_pending(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    /// Number of recipients with at least one waiting message.
    pub fn recipients(&self) -> usize {
        self.queues.len()
    }
}

impl<M> Default for PendingQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}
