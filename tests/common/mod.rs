//! Shared test utilities for integration tests.
//!
//! Helpers for building supervisors over a scripted processor, plus proptest
//! strategies for arrival sequences.

#![allow(dead_code)] // These utilities are used by other integration test files

use std::sync::Arc;

use durable_batcher::{
    BatcherConfig, BatcherSupervisor, Duration, MockBatchProcessor, MockResponse, SignalSender,
    WorkItemId,
};
use proptest::prelude::*;

// =============================================================================
// Fixtures
// =============================================================================

/// A supervisor wired to a scripted processor, with its sender and the mock.
pub struct Harness {
    pub supervisor: BatcherSupervisor,
    pub sender: SignalSender,
    pub processor: Arc<MockBatchProcessor>,
}

impl Harness {
    /// Builds a harness with the given batch size and default everything else.
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self::with_config(BatcherConfig::default().with_batch_size(batch_size), Vec::new())
    }

    /// Builds a harness with a config and a script of processor responses.
    pub fn with_config(config: BatcherConfig, script: Vec<MockResponse>) -> Self {
        let processor = Arc::new(
            script
                .into_iter()
                .fold(MockBatchProcessor::new(), |mock, response| mock.with_response(response)),
        );
        let (supervisor, sender) =
            BatcherSupervisor::new(config, processor.clone()).expect("valid config");
        Self {
            supervisor,
            sender,
            processor,
        }
    }

    /// Signals every id in order.
    pub async fn signal_all(&self, names: &[&str]) {
        for name in names {
            self.sender.signal(*name).await.expect("channel open");
        }
    }

    /// Every dispatched batch, flattened to plain strings.
    pub fn dispatched(&self) -> Vec<Vec<String>> {
        self.processor
            .calls()
            .into_iter()
            .map(|batch| batch.into_iter().map(WorkItemId::into_inner).collect())
            .collect()
    }
}

/// Converts string literals into work-item ids.
pub fn ids(names: &[&str]) -> Vec<WorkItemId> {
    names.iter().map(|n| WorkItemId::from(*n)).collect()
}

/// Numbered ids `item-0 .. item-{count-1}`.
pub fn numbered(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("item-{}", i)).collect()
}

/// Config with a short quiescence interval for deadline scenarios.
pub fn short_deadline_config(batch_size: usize, seconds: u64) -> BatcherConfig {
    BatcherConfig::default()
        .with_batch_size(batch_size)
        .with_quiescence_interval(Duration::from_seconds(seconds))
}

// =============================================================================
// Proptest Strategies
// =============================================================================

/// Strategy for batch sizes worth exercising.
pub fn batch_size_strategy() -> impl Strategy<Value = usize> {
    1usize..=12
}

/// Strategy for non-empty, distinct-looking work-item ids.
pub fn work_item_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,6}-[0-9]{1,3}"
}

/// Strategy for an arrival sequence.
pub fn arrivals_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(work_item_strategy(), 0..40)
}
