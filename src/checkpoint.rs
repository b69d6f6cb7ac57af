//! Checkpoints handed from one accumulator instance to its successor.
//!
//! A checkpoint is the only state that crosses an instance boundary: the
//! undispatched items in arrival order, plus the generation of the instance
//! it seeds. It serializes to JSON so a host can persist it and resume after
//! a crash.
//!
//! ```
//! use durable_batcher::Checkpoint;
//!
//! let checkpoint = Checkpoint::new(3, vec!["a".into(), "b".into()]);
//! let json = checkpoint.to_json().unwrap();
//! let restored = Checkpoint::from_json(&json).unwrap();
//! assert_eq!(restored.pending, checkpoint.pending);
//! assert_eq!(restored.generation, 3);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BatcherError;
use crate::types::WorkItemId;

/// Residual state seeding the next accumulator instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Generation number of the instance this checkpoint seeds.
    pub generation: u64,
    /// Items not yet dispatched, oldest first.
    pub pending: Vec<WorkItemId>,
    /// When the checkpoint was taken.
    pub taken_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Creates a checkpoint seeding generation `generation`.
    pub fn new(generation: u64, pending: Vec<WorkItemId>) -> Self {
        Self {
            generation,
            pending,
            taken_at: Utc::now(),
        }
    }

    /// The checkpoint a brand-new batcher starts from: generation 0, nothing pending.
    pub fn initial() -> Self {
        Self::new(0, Vec::new())
    }

    /// A generation-0 checkpoint carrying items from an earlier run.
    pub fn with_pending(pending: Vec<WorkItemId>) -> Self {
        Self::new(0, pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn to_json(&self) -> Result<String, BatcherError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, BatcherError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::initial()
    }
}
