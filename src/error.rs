//! Error types for the durable batcher.
//!
//! Every error surfaces to the caller of an accumulator instance (usually the
//! [`BatcherSupervisor`](crate::supervisor::BatcherSupervisor)). Nothing is
//! retried or swallowed internally.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for the durable batcher.
#[derive(Debug, Error)]
pub enum BatcherError {
    /// The inbound signal channel failed to receive or send.
    #[error("Transport error: {message}")]
    Transport {
        /// Error message describing what went wrong
        message: String,
    },

    /// The downstream processor rejected a batch.
    #[error("Dispatch error: {message}")]
    Dispatch {
        /// Error message reported by the processor
        message: String,
        /// Number of items in the failed batch
        batch_len: usize,
        /// Whether the batch was put back into `pending` before terminating
        requeued: bool,
    },

    /// The downstream processor did not answer within the dispatch timeout.
    #[error("Dispatch timed out after {timeout_secs}s")]
    DispatchTimeout {
        /// The configured dispatch timeout in seconds
        timeout_secs: u64,
        /// Number of items in the failed batch
        batch_len: usize,
        /// Whether the batch was put back into `pending` before terminating
        requeued: bool,
    },

    /// Validation error for invalid configuration or arguments.
    #[error("Validation error: {message}")]
    Validation {
        /// Error message describing the validation failure
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    SerDes {
        /// Error message describing the serialization failure
        message: String,
    },
}

impl BatcherError {
    /// Creates a new Transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a new Dispatch error for a batch that was not re-queued.
    pub fn dispatch(message: impl Into<String>, batch_len: usize) -> Self {
        Self::Dispatch {
            message: message.into(),
            batch_len,
            requeued: false,
        }
    }

    /// Creates a new Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new SerDes error.
    pub fn serdes(message: impl Into<String>) -> Self {
        Self::SerDes {
            message: message.into(),
        }
    }

    /// Returns true if this error ended a dispatch cycle.
    pub fn is_dispatch_failure(&self) -> bool {
        matches!(self, Self::Dispatch { .. } | Self::DispatchTimeout { .. })
    }

    /// Returns true if the failed batch was restored into `pending`.
    pub fn is_requeued(&self) -> bool {
        matches!(
            self,
            Self::Dispatch { requeued: true, .. } | Self::DispatchTimeout { requeued: true, .. }
        )
    }

    /// Marks a dispatch failure as re-queued. Other variants are returned unchanged.
    pub(crate) fn into_requeued(self) -> Self {
        match self {
            Self::Dispatch {
                message, batch_len, ..
            } => Self::Dispatch {
                message,
                batch_len,
                requeued: true,
            },
            Self::DispatchTimeout {
                timeout_secs,
                batch_len,
                ..
            } => Self::DispatchTimeout {
                timeout_secs,
                batch_len,
                requeued: true,
            },
            other => other,
        }
    }

    /// Classifies the error as the reason an instance terminated.
    pub fn termination_reason(&self) -> TerminationReason {
        match self {
            Self::Transport { .. } => TerminationReason::TransportError,
            Self::Dispatch { .. } => TerminationReason::DispatchFailed,
            Self::DispatchTimeout { .. } => TerminationReason::DispatchTimedOut,
            Self::Validation { .. } => TerminationReason::InvalidConfiguration,
            Self::SerDes { .. } => TerminationReason::SerializationError,
        }
    }
}

/// Reason an accumulator instance stopped.
///
/// A cycle that completes normally continues as new and has no reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The inbound signal channel failed
    TransportError,
    /// The processor returned an error
    DispatchFailed,
    /// The processor exceeded the dispatch timeout
    DispatchTimedOut,
    /// The configuration was rejected before start
    InvalidConfiguration,
    /// A checkpoint or query payload could not be (de)serialized
    SerializationError,
}

impl From<serde_json::Error> for BatcherError {
    fn from(error: serde_json::Error) -> Self {
        Self::serdes(error.to_string())
    }
}
