//! Read-only query surface over the accumulator's pending items.
//!
//! The running instance publishes a [`PendingSnapshot`] after every change to
//! `pending` or the timer. Readers hold a [`QueryHandle`] and only ever see the
//! last published snapshot, so a query never waits on the control loop and
//! keeps answering after the instance has stopped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::accumulator::AccumulatorPhase;
use crate::error::BatcherError;
use crate::types::WorkItemId;

/// Name of the query answered with the pending items.
pub const CURRENT_DATA_QUERY: &str = "current_data";

/// Point-in-time view of an accumulator instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSnapshot {
    /// Items not yet dispatched, oldest first.
    pub pending: Vec<WorkItemId>,
    /// When the deadline timer was last armed, if it is armed.
    pub timer_armed_at: Option<DateTime<Utc>>,
    /// Generation of the instance that published the snapshot.
    pub generation: u64,
    /// Phase of that instance when it published.
    pub phase: AccumulatorPhase,
}

impl Default for PendingSnapshot {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            timer_armed_at: None,
            generation: 0,
            phase: AccumulatorPhase::AwaitingFirstEvent,
        }
    }
}

/// Write side of the query surface, owned by the supervisor and lent to instances.
#[derive(Debug)]
pub struct QueryPublisher {
    tx: watch::Sender<PendingSnapshot>,
}

impl QueryPublisher {
    /// Replaces the published snapshot. Works with or without live readers.
    pub fn publish(&self, snapshot: PendingSnapshot) {
        self.tx.send_replace(snapshot);
    }

    /// Creates another reader of this publisher.
    pub fn subscribe(&self) -> QueryHandle {
        QueryHandle {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read side of the query surface.
#[derive(Debug, Clone)]
pub struct QueryHandle {
    rx: watch::Receiver<PendingSnapshot>,
}

impl QueryHandle {
    /// Returns the pending items, oldest first, without touching the accumulator.
    pub fn current_pending(&self) -> Vec<WorkItemId> {
        self.rx.borrow().pending.clone()
    }

    /// Returns the full last-published snapshot.
    pub fn snapshot(&self) -> PendingSnapshot {
        self.rx.borrow().clone()
    }

    /// When the deadline timer was armed, if it is armed.
    pub fn timer_armed_at(&self) -> Option<DateTime<Utc>> {
        self.rx.borrow().timer_armed_at
    }

    /// Generation of the instance that last published.
    pub fn generation(&self) -> u64 {
        self.rx.borrow().generation
    }

    /// Answers a named query with a JSON payload.
    ///
    /// Only [`CURRENT_DATA_QUERY`] is registered; it returns the pending items
    /// as a JSON array of strings.
    pub fn query(&self, name: &str) -> Result<String, BatcherError> {
        match name {
            CURRENT_DATA_QUERY => Ok(serde_json::to_string(&self.rx.borrow().pending)?),
            other => Err(BatcherError::validation(format!(
                "Unknown query '{}'; registered queries: [{}]",
                other, CURRENT_DATA_QUERY
            ))),
        }
    }

    /// Waits until a snapshot newer than the last one seen is published.
    ///
    /// Returns false once the publisher is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Creates a publisher/handle pair seeded with `initial`.
pub fn query_channel(initial: PendingSnapshot) -> (QueryPublisher, QueryHandle) {
    let (tx, rx) = watch::channel(initial);
    (QueryPublisher { tx }, QueryHandle { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(items: &[&str]) -> PendingSnapshot {
        PendingSnapshot {
            pending: items.iter().map(|i| (*i).into()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_current_pending_is_idempotent() {
        let (publisher, handle) = query_channel(PendingSnapshot::default());
        publisher.publish(snapshot(&["a", "b"]));

        let first = handle.current_pending();
        let second = handle.current_pending();
        assert_eq!(first, second);
        assert_eq!(first, vec![WorkItemId::from("a"), WorkItemId::from("b")]);
    }

    #[test]
    fn test_named_query() {
        let (publisher, handle) = query_channel(PendingSnapshot::default());
        publisher.publish(snapshot(&["c1", "c2"]));

        assert_eq!(handle.query(CURRENT_DATA_QUERY).unwrap(), r#"["c1","c2"]"#);
        let error = handle.query("other").unwrap_err();
        assert!(matches!(error, BatcherError::Validation { .. }));
    }

    #[test]
    fn test_snapshot_survives_publisher_drop() {
        let (publisher, handle) = query_channel(PendingSnapshot::default());
        publisher.publish(snapshot(&["kept"]));
        drop(publisher);

        assert_eq!(handle.current_pending(), vec![WorkItemId::from("kept")]);
    }

    #[tokio::test]
    async fn test_changed_notifies_subscribers() {
        let (publisher, _handle) = query_channel(PendingSnapshot::default());
        let mut subscriber = publisher.subscribe();
        publisher.publish(snapshot(&["x"]));

        assert!(subscriber.changed().await);
        assert_eq!(subscriber.current_pending().len(), 1);
    }
}
