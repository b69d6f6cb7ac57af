//! Configuration types for the durable batcher.
//!
//! [`BatcherConfig`] carries the two constants that drive the accumulator
//! (`batch_size` and `quiescence_interval`) plus the knobs the surrounding
//! host needs: the dispatch timeout, the inbound signal name, and the policy
//! applied when a dispatch fails.
//!
//! ## Example
//!
//! ```rust
//! use durable_batcher::{BatcherConfig, DispatchFailurePolicy, Duration};
//!
//! let config = BatcherConfig::default()
//!     .with_batch_size(25)
//!     .with_quiescence_interval(Duration::from_minutes(1))
//!     .with_dispatch_failure_policy(DispatchFailurePolicy::Requeue);
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.batch_size, 25);
//! ```

use serde::{Deserialize, Serialize};

use crate::duration::Duration;
use crate::error::BatcherError;

/// Default maximum number of items per dispatched batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default quiescence interval in seconds.
pub const DEFAULT_QUIESCENCE_SECONDS: u64 = 300;

/// Default dispatch timeout in minutes.
pub const DEFAULT_DISPATCH_TIMEOUT_MINUTES: u64 = 50;

/// Default name of the inbound signal channel.
pub const DEFAULT_SIGNAL_NAME: &str = "batcherSignal";

/// Default capacity of the inbound signal buffer.
pub const DEFAULT_SIGNAL_BUFFER: usize = 1024;

/// What happens to a cut batch when the processor fails or times out.
///
/// Either way the instance terminates with the dispatch error. The policy
/// only decides whether the failed items survive in `pending`.
///
/// ## Discard (Default)
/// - The batch was removed from `pending` at cut time and stays removed
/// - Matches the reference behavior: items in a failed batch are lost
///
/// ## Requeue
/// - The batch is put back at the front of `pending`, in its original order
/// - The published query snapshot reflects the restored items, so a host can
///   restart from it without losing work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchFailurePolicy {
    /// Drop the failed batch.
    #[default]
    Discard,
    /// Restore the failed batch at the front of `pending`.
    Requeue,
}

impl DispatchFailurePolicy {
    /// Returns true if failed batches are restored into `pending`.
    pub fn is_requeue(&self) -> bool {
        matches!(self, Self::Requeue)
    }
}

/// Configuration for an accumulator and its supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatcherConfig {
    /// Maximum number of items per dispatched batch.
    pub batch_size: usize,
    /// Time without a cut after which the pending items are dispatched anyway.
    pub quiescence_interval: Duration,
    /// Upper bound on a single processor call.
    pub dispatch_timeout: Duration,
    /// What to do with a batch whose dispatch failed.
    pub on_dispatch_failure: DispatchFailurePolicy,
    /// Name of the inbound signal channel.
    pub signal_name: String,
    /// Capacity of the inbound signal buffer.
    pub signal_buffer: usize,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            quiescence_interval: Duration::from_seconds(DEFAULT_QUIESCENCE_SECONDS),
            dispatch_timeout: Duration::from_minutes(DEFAULT_DISPATCH_TIMEOUT_MINUTES),
            on_dispatch_failure: DispatchFailurePolicy::default(),
            signal_name: DEFAULT_SIGNAL_NAME.to_string(),
            signal_buffer: DEFAULT_SIGNAL_BUFFER,
        }
    }
}

impl BatcherConfig {
    /// Creates a BatcherConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of items per batch.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the quiescence interval.
    pub fn with_quiescence_interval(mut self, interval: Duration) -> Self {
        self.quiescence_interval = interval;
        self
    }

    /// Sets the dispatch timeout.
    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    /// Sets the dispatch failure policy.
    pub fn with_dispatch_failure_policy(mut self, policy: DispatchFailurePolicy) -> Self {
        self.on_dispatch_failure = policy;
        self
    }

    /// Sets the inbound signal channel name.
    pub fn with_signal_name(mut self, name: impl Into<String>) -> Self {
        self.signal_name = name.into();
        self
    }

    /// Sets the inbound signal buffer capacity.
    pub fn with_signal_buffer(mut self, capacity: usize) -> Self {
        self.signal_buffer = capacity;
        self
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, BatcherError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value can drive an accumulator.
    pub fn validate(&self) -> Result<(), BatcherError> {
        if self.batch_size == 0 {
            return Err(BatcherError::validation("batch_size must be at least 1"));
        }
        if self.signal_buffer == 0 {
            return Err(BatcherError::validation("signal_buffer must be at least 1"));
        }
        if self.signal_name.is_empty() {
            return Err(BatcherError::validation("signal_name cannot be empty"));
        }
        self.quiescence_interval
            .validate_positive("quiescence_interval")?;
        self.dispatch_timeout.validate_positive("dispatch_timeout")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_reference_constants() {
        let config = BatcherConfig::default();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.quiescence_interval.to_seconds(), 300);
        assert_eq!(config.dispatch_timeout.to_seconds(), 50 * 60);
        assert_eq!(config.on_dispatch_failure, DispatchFailurePolicy::Discard);
        assert_eq!(config.signal_name, "batcherSignal");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let config = BatcherConfig::new()
            .with_batch_size(3)
            .with_quiescence_interval(Duration::from_seconds(5))
            .with_dispatch_timeout(Duration::from_seconds(1))
            .with_dispatch_failure_policy(DispatchFailurePolicy::Requeue)
            .with_signal_name("customers")
            .with_signal_buffer(8);
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.quiescence_interval.to_seconds(), 5);
        assert_eq!(config.dispatch_timeout.to_seconds(), 1);
        assert!(config.on_dispatch_failure.is_requeue());
        assert_eq!(config.signal_name, "customers");
        assert_eq!(config.signal_buffer, 8);
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let result = BatcherConfig::default().with_batch_size(0).validate();
        match result {
            Err(BatcherError::Validation { message }) => assert!(message.contains("batch_size")),
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let config = BatcherConfig::default().with_quiescence_interval(Duration::from_seconds(0));
        assert!(config.validate().is_err());

        let config = BatcherConfig::default().with_dispatch_timeout(Duration::from_seconds(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_signal_name() {
        assert!(BatcherConfig::default().with_signal_name("").validate().is_err());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config =
            BatcherConfig::from_json(r#"{"batch_size": 4, "on_dispatch_failure": "requeue"}"#)
                .unwrap();
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.on_dispatch_failure, DispatchFailurePolicy::Requeue);
        assert_eq!(config.quiescence_interval.to_seconds(), 300);
    }

    #[test]
    fn test_from_json_validates() {
        let result = BatcherConfig::from_json(r#"{"batch_size": 0}"#);
        assert!(matches!(result, Err(BatcherError::Validation { .. })));

        let result = BatcherConfig::from_json("not json");
        assert!(matches!(result, Err(BatcherError::SerDes { .. })));
    }
}
