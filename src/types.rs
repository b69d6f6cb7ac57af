//! Newtype wrappers and value types for the durable batcher.
//!
//! # Example
//!
//! ```rust
//! use durable_batcher::types::{Batch, WorkItemId};
//!
//! let id: WorkItemId = "customer-17".into();
//! assert!(id.starts_with("customer-"));
//!
//! let batch = Batch::new(vec![id.clone(), WorkItemId::from("customer-18")]);
//! assert_eq!(batch.len(), 2);
//! assert_eq!(batch.first(), Some(&id));
//! ```

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for one unit of work.
///
/// No structure is assumed and uniqueness is not enforced: the same id
/// signalled twice is accumulated twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItemId(String);

impl WorkItemId {
    /// Creates a new `WorkItemId`.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string value.
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns a reference to the inner string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for WorkItemId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for WorkItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for WorkItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of one accumulator instance, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Creates a fresh random instance id.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered group of work items cut from the front of the pending queue.
///
/// A batch is immutable once formed; it is handed to the dispatcher by value
/// and therefore consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Batch(Vec<WorkItemId>);

impl Batch {
    /// Creates a batch from items in arrival order.
    pub fn new(items: Vec<WorkItemId>) -> Self {
        Self(items)
    }

    /// Returns the items in arrival order.
    pub fn items(&self) -> &[WorkItemId] {
        &self.0
    }

    /// Consumes the batch and returns its items.
    pub fn into_items(self) -> Vec<WorkItemId> {
        self.0
    }
}

impl Deref for Batch {
    type Target = [WorkItemId];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl IntoIterator for Batch {
    type Item = WorkItemId;
    type IntoIter = std::vec::IntoIter<WorkItemId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_id_conversions() {
        let from_str = WorkItemId::from("item-1");
        let from_string = WorkItemId::from("item-1".to_string());
        assert_eq!(from_str, from_string);
        assert_eq!(from_str.as_str(), "item-1");
        assert_eq!(from_str.to_string(), "item-1");
        assert_eq!(from_string.into_inner(), "item-1");
    }

    #[test]
    fn test_work_item_id_is_transparent_in_json() {
        let id = WorkItemId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""abc""#);
    }

    #[test]
    fn test_batch_preserves_order() {
        let batch = Batch::new(vec!["a".into(), "b".into(), "c".into()]);
        let ids: Vec<&str> = batch.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(serde_json::to_string(&batch).unwrap(), r#"["a","b","c"]"#);
    }

    #[test]
    fn test_instance_ids_are_distinct() {
        assert_ne!(InstanceId::new_v4(), InstanceId::new_v4());
    }
}
