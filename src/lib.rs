//! # Durable Batcher
//!
//! A long-running batch accumulator that collects work-item ids arriving over
//! a signal channel and dispatches them to a downstream processor in bounded
//! batches.
//!
//! ## Overview
//!
//! A batch is cut when either trigger fires:
//!
//! - **Size**: more than `batch_size` items are pending (strictly greater).
//! - **Deadline**: the quiescence interval elapsed with items pending.
//!
//! After every dispatch the running instance *continues as new*: it folds any
//! arrivals already delivered into its pending items, hands them to a fresh
//! instance as a [`Checkpoint`], and terminates. Each instance therefore lives
//! for exactly one dispatch cycle and the batcher's own history stays bounded.
//!
//! ### Key Features
//!
//! - **Crash-recoverable**: checkpoints serialize to JSON and a supervisor can
//!   resume from one.
//! - **No lost events**: the selector never drops an arrival or a deadline
//!   that loses a race; arrivals an instance did not consume stay queued for
//!   its successor in delivery order.
//! - **Read-only queries**: [`QueryHandle::current_pending`] answers without
//!   waiting on the control loop, including after the instance has stopped.
//! - **Explicit failure policy**: a failed dispatch either discards the batch
//!   (the default) or re-queues it ([`DispatchFailurePolicy`]).
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use durable_batcher::{BatcherConfig, BatcherSupervisor, EchoProcessor};
//!
//! # async fn example() -> Result<(), durable_batcher::BatcherError> {
//! let config = BatcherConfig::default();
//! let (mut supervisor, sender) =
//!     BatcherSupervisor::new(config, Arc::new(EchoProcessor::default()))?;
//!
//! let queries = supervisor.query_handle();
//! tokio::spawn(async move {
//!     for id in ["customer-1", "customer-2"] {
//!         sender.signal(id).await.ok();
//!     }
//!     // keep `sender` alive for as long as items may arrive
//! });
//!
//! println!("pending: {:?}", queries.current_pending());
//! supervisor.run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! - [`Accumulator`]: one instance of the state machine, consumed by
//!   [`Accumulator::run`].
//! - [`BatcherSupervisor`]: builds instances back to back from checkpoints.
//! - [`BatchProcessor`]: the downstream seam; [`EchoProcessor`] is the
//!   placeholder implementation.
//! - [`signal_channel`]: the inbound transport.

pub mod accumulator;
pub mod checkpoint;
pub mod config;
pub mod dispatcher;
pub mod duration;
pub mod error;
pub mod query;
pub mod queue;
pub mod selector;
pub mod signal;
pub mod supervisor;
pub mod timer;
pub mod types;

pub use accumulator::{evaluate, Accumulator, AccumulatorPhase, Continuation, Decision};
pub use checkpoint::Checkpoint;
pub use config::{BatcherConfig, DispatchFailurePolicy};
pub use dispatcher::{
    BatchDispatcher, BatchProcessor, EchoProcessor, MockBatchProcessor, MockResponse,
    SharedBatchProcessor,
};
pub use duration::Duration;
pub use error::{BatcherError, TerminationReason};
pub use query::{query_channel, PendingSnapshot, QueryHandle, QueryPublisher, CURRENT_DATA_QUERY};
pub use queue::ItemQueue;
pub use selector::{Event, EventSelector};
pub use signal::{signal_channel, SignalReceiver, SignalSender};
pub use supervisor::{BatcherSupervisor, CheckpointHook, CycleReport};
pub use timer::DeadlineTimer;
pub use types::{Batch, InstanceId, WorkItemId};
