//! Batch dispatch to the downstream processor.
//!
//! The accumulator only depends on the [`BatchProcessor`] trait. The
//! [`BatchDispatcher`] wraps a processor with the dispatch timeout and maps
//! every failure to a dispatch error; it never retries.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::timeout;

use crate::error::BatcherError;
use crate::types::Batch;

/// The downstream processor that consumes dispatched batches.
///
/// Implementations must tolerate at-least-once delivery: a batch may be
/// processed again after a crash between dispatch and checkpoint.
#[async_trait]
pub trait BatchProcessor: Send + Sync {
    /// Processes one batch and returns the processed items.
    async fn process(&self, batch: Batch) -> Result<Batch, BatcherError>;
}

/// Type alias for a shared BatchProcessor.
pub type SharedBatchProcessor = Arc<dyn BatchProcessor>;

/// Placeholder processor: waits a fixed delay and echoes the batch back.
#[derive(Debug, Clone)]
pub struct EchoProcessor {
    delay: std::time::Duration,
}

impl EchoProcessor {
    /// Default artificial processing delay.
    pub const DEFAULT_DELAY: std::time::Duration = std::time::Duration::from_secs(30);

    pub fn new(delay: std::time::Duration) -> Self {
        Self { delay }
    }
}

impl Default for EchoProcessor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

#[async_trait]
impl BatchProcessor for EchoProcessor {
    async fn process(&self, batch: Batch) -> Result<Batch, BatcherError> {
        tracing::info!(batch_len = batch.len(), "Processing batch");
        tokio::time::sleep(self.delay).await;
        Ok(batch)
    }
}

/// Invokes a processor under a bounded timeout.
#[derive(Clone)]
pub struct BatchDispatcher {
    processor: SharedBatchProcessor,
    timeout: std::time::Duration,
}

impl std::fmt::Debug for BatchDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchDispatcher")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl BatchDispatcher {
    pub fn new(processor: SharedBatchProcessor, timeout: std::time::Duration) -> Self {
        Self { processor, timeout }
    }

    /// Dispatches a batch and waits for the processor's result.
    ///
    /// Processor errors that are not already dispatch errors are wrapped as
    /// one. Exceeding the timeout yields [`BatcherError::DispatchTimeout`].
    pub async fn dispatch(&self, batch: Batch) -> Result<Batch, BatcherError> {
        let batch_len = batch.len();
        tracing::debug!(batch_len, timeout_secs = self.timeout.as_secs(), "Dispatching batch");

        match timeout(self.timeout, self.processor.process(batch)).await {
            Ok(Ok(processed)) => {
                tracing::debug!(batch_len, "Batch dispatched");
                Ok(processed)
            }
            Ok(Err(error)) if error.is_dispatch_failure() => {
                tracing::warn!(batch_len, error = %error, "Batch dispatch failed");
                Err(error)
            }
            Ok(Err(error)) => {
                tracing::warn!(batch_len, error = %error, "Batch dispatch failed");
                Err(BatcherError::dispatch(error.to_string(), batch_len))
            }
            Err(_) => {
                tracing::warn!(
                    batch_len,
                    timeout_secs = self.timeout.as_secs(),
                    "Batch dispatch timed out"
                );
                Err(BatcherError::DispatchTimeout {
                    timeout_secs: self.timeout.as_secs(),
                    batch_len,
                    requeued: false,
                })
            }
        }
    }
}

/// Scripted outcome for one [`MockBatchProcessor`] call.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return the batch unchanged.
    Echo,
    /// Fail with a dispatch error carrying this message.
    Fail(String),
    /// Never answer; the dispatcher's timeout decides.
    Hang,
}

/// Processor for tests: plays scripted responses and records every batch.
///
/// Once the script is exhausted every call echoes.
#[derive(Debug, Default)]
pub struct MockBatchProcessor {
    responses: Mutex<VecDeque<MockResponse>>,
    calls: Mutex<Vec<Batch>>,
}

impl MockBatchProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a response to be played on the next unanswered call.
    pub fn with_response(self, response: MockResponse) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(response);
        self
    }

    /// Every batch received so far, in call order.
    pub fn calls(&self) -> Vec<Batch> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[async_trait]
impl BatchProcessor for MockBatchProcessor {
    async fn process(&self, batch: Batch) -> Result<Batch, BatcherError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(batch.clone());
        let response = self
            .responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or(MockResponse::Echo);

        match response {
            MockResponse::Echo => Ok(batch),
            MockResponse::Fail(message) => Err(BatcherError::dispatch(message, batch.len())),
            MockResponse::Hang => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn batch(names: &[&str]) -> Batch {
        Batch::new(names.iter().map(|n| (*n).into()).collect())
    }

    #[tokio::test(start_paused = true)]
    async fn test_echo_processor_returns_input_after_delay() {
        let processor = EchoProcessor::new(Duration::from_secs(30));
        let start = tokio::time::Instant::now();
        let result = processor.process(batch(&["a", "b"])).await.unwrap();
        assert_eq!(result, batch(&["a", "b"]));
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_success() {
        let mock = Arc::new(MockBatchProcessor::new());
        let dispatcher = BatchDispatcher::new(mock.clone(), Duration::from_secs(60));

        let result = dispatcher.dispatch(batch(&["a"])).await.unwrap();
        assert_eq!(result, batch(&["a"]));
        assert_eq!(mock.calls(), vec![batch(&["a"])]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_failure_is_propagated() {
        let mock = Arc::new(
            MockBatchProcessor::new().with_response(MockResponse::Fail("downstream 500".into())),
        );
        let dispatcher = BatchDispatcher::new(mock.clone(), Duration::from_secs(60));

        let error = dispatcher.dispatch(batch(&["a", "b"])).await.unwrap_err();
        match error {
            BatcherError::Dispatch {
                message,
                batch_len,
                requeued,
            } => {
                assert_eq!(message, "downstream 500");
                assert_eq!(batch_len, 2);
                assert!(!requeued);
            }
            other => panic!("Expected Dispatch error, got {:?}", other),
        }
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_timeout() {
        let mock = Arc::new(MockBatchProcessor::new().with_response(MockResponse::Hang));
        let dispatcher = BatchDispatcher::new(mock, Duration::from_secs(5));

        let error = dispatcher.dispatch(batch(&["a"])).await.unwrap_err();
        assert!(matches!(
            error,
            BatcherError::DispatchTimeout {
                timeout_secs: 5,
                batch_len: 1,
                requeued: false
            }
        ));
    }

    struct TransportFailingProcessor;

    #[async_trait]
    impl BatchProcessor for TransportFailingProcessor {
        async fn process(&self, _batch: Batch) -> Result<Batch, BatcherError> {
            Err(BatcherError::transport("connection reset"))
        }
    }

    #[tokio::test]
    async fn test_other_processor_errors_become_dispatch_errors() {
        let dispatcher =
            BatchDispatcher::new(Arc::new(TransportFailingProcessor), Duration::from_secs(5));
        let error = dispatcher.dispatch(batch(&["a", "b", "c"])).await.unwrap_err();
        assert!(error.is_dispatch_failure());
        assert!(error.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_mock_script_falls_back_to_echo() {
        let mock = MockBatchProcessor::new().with_response(MockResponse::Fail("once".into()));
        assert!(mock.process(batch(&["a"])).await.is_err());
        assert!(mock.process(batch(&["b"])).await.is_ok());
        assert_eq!(mock.call_count(), 2);
    }
}
