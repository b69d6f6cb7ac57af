//! Inbound signal channel for work-item arrivals.
//!
//! The channel is the transport between upstream producers and the
//! accumulator. It outlives individual accumulator instances: the supervisor
//! owns the [`SignalReceiver`] and lends it to each instance in turn, so
//! arrivals an instance did not consume stay queued for its successor in
//! delivery order.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

use crate::error::BatcherError;
use crate::types::WorkItemId;

/// Handle for signalling work-item arrivals to the accumulator.
#[derive(Debug, Clone)]
pub struct SignalSender {
    name: Arc<str>,
    tx: mpsc::Sender<WorkItemId>,
}

impl SignalSender {
    /// Returns the channel name this sender signals on.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signals an arrival, waiting for buffer space if the channel is full.
    pub async fn signal(&self, id: impl Into<WorkItemId>) -> Result<(), BatcherError> {
        let id = id.into();
        tracing::debug!(signal = %self.name, item = %id, "Sending signal");
        self.tx.send(id).await.map_err(|_| {
            BatcherError::transport(format!("Signal channel '{}' is closed", self.name))
        })
    }

    /// Signals an arrival without waiting. A full buffer is a transport error.
    pub fn try_signal(&self, id: impl Into<WorkItemId>) -> Result<(), BatcherError> {
        match self.tx.try_send(id.into()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(BatcherError::transport(format!(
                "Signal channel '{}' is full",
                self.name
            ))),
            Err(TrySendError::Closed(_)) => Err(BatcherError::transport(format!(
                "Signal channel '{}' is closed",
                self.name
            ))),
        }
    }

    /// Returns true once the receiving side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of the signal channel.
#[derive(Debug)]
pub struct SignalReceiver {
    name: Arc<str>,
    rx: mpsc::Receiver<WorkItemId>,
}

impl SignalReceiver {
    /// Returns the channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits for the next arrival.
    ///
    /// Cancel safe: if the future is dropped before completing, no arrival is
    /// consumed. Returns a transport error once every sender is gone and the
    /// buffer is empty.
    pub async fn recv(&mut self) -> Result<WorkItemId, BatcherError> {
        match self.rx.recv().await {
            Some(id) => Ok(id),
            None => Err(BatcherError::transport(format!(
                "Signal channel '{}' closed: no senders remain",
                self.name
            ))),
        }
    }

    /// Returns an already-delivered arrival, or `None` if nothing is buffered.
    pub fn try_recv(&mut self) -> Option<WorkItemId> {
        match self.rx.try_recv() {
            Ok(id) => Some(id),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

/// Creates a named signal channel with the given buffer capacity.
pub fn signal_channel(name: &str, capacity: usize) -> (SignalSender, SignalReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let name: Arc<str> = Arc::from(name);
    (
        SignalSender {
            name: name.clone(),
            tx,
        },
        SignalReceiver { name, rx },
    )
}
