//! The pending item queue.
//!
//! Items are appended in arrival order and only ever leave from the front,
//! either by a cut (a prefix of at most `batch_size` items) or when the whole
//! queue is handed to the next instance at a checkpoint.

use std::collections::VecDeque;

use crate::types::{Batch, WorkItemId};

/// Ordered sequence of work items waiting to be dispatched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQueue {
    items: VecDeque<WorkItemId>,
}

impl ItemQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a queue seeded with inherited items, oldest first.
    pub fn from_items(items: impl IntoIterator<Item = WorkItemId>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    /// Appends an arrival to the back of the queue.
    pub fn push(&mut self, id: WorkItemId) {
        self.items.push_back(id);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Removes the first `min(len, max)` items and returns them as a batch.
    pub fn cut(&mut self, max: usize) -> Batch {
        let take = self.items.len().min(max);
        Batch::new(self.items.drain(..take).collect())
    }

    /// Puts a failed batch back at the front, keeping its original order.
    pub fn requeue_front(&mut self, batch: Batch) {
        for id in batch.into_items().into_iter().rev() {
            self.items.push_front(id);
        }
    }

    /// Returns a copy of the queue contents, oldest first.
    pub fn snapshot(&self) -> Vec<WorkItemId> {
        self.items.iter().cloned().collect()
    }

    /// Consumes the queue and returns its items, oldest first.
    pub fn into_vec(self) -> Vec<WorkItemId> {
        self.items.into()
    }
}
