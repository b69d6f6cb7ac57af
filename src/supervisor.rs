//! Continue-as-new supervision of accumulator instances.
//!
//! The supervisor plays the part of the durable-execution substrate: it owns
//! the signal receiver, the query publisher, and the latest checkpoint. Each
//! cycle it builds a fresh [`Accumulator`] from the checkpoint, runs it
//! through one dispatch, and keeps only the continuation's checkpoint. No
//! instance history survives a cycle, so the batcher can run indefinitely.

use std::convert::Infallible;

use crate::accumulator::{Accumulator, Continuation};
use crate::checkpoint::Checkpoint;
use crate::config::BatcherConfig;
use crate::dispatcher::{BatchDispatcher, SharedBatchProcessor};
use crate::error::BatcherError;
use crate::query::{query_channel, PendingSnapshot, QueryHandle, QueryPublisher};
use crate::signal::{signal_channel, SignalReceiver, SignalSender};
use crate::types::Batch;

/// Callback invoked with every checkpoint a cycle produces.
pub type CheckpointHook = Box<dyn Fn(&Checkpoint) + Send + Sync>;

/// Summary of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Generation of the instance that ran the cycle.
    pub generation: u64,
    /// The batch as returned by the processor.
    pub dispatched: Batch,
    /// Items handed to the successor.
    pub carried_over: usize,
    /// Events the instance consumed.
    pub events_observed: u64,
}

/// Runs accumulator instances back to back, one per dispatch cycle.
pub struct BatcherSupervisor {
    config: BatcherConfig,
    dispatcher: BatchDispatcher,
    receiver: SignalReceiver,
    checkpoint: Checkpoint,
    query: QueryPublisher,
    handle: QueryHandle,
    on_checkpoint: Option<CheckpointHook>,
    cycles_completed: u64,
    in_flight: bool,
}

impl BatcherSupervisor {
    /// Creates a supervisor and the sender for its inbound signal channel.
    pub fn new(
        config: BatcherConfig,
        processor: SharedBatchProcessor,
    ) -> Result<(Self, SignalSender), BatcherError> {
        let (sender, receiver) = signal_channel(&config.signal_name, config.signal_buffer);
        let supervisor = Self::with_receiver(config, processor, receiver)?;
        Ok((supervisor, sender))
    }

    /// Creates a supervisor over an existing signal receiver.
    ///
    /// The receiver must listen on `config.signal_name`.
    pub fn with_receiver(
        config: BatcherConfig,
        processor: SharedBatchProcessor,
        receiver: SignalReceiver,
    ) -> Result<Self, BatcherError> {
        config.validate()?;
        if receiver.name() != config.signal_name {
            return Err(BatcherError::validation(format!(
                "Receiver listens on '{}' but signal_name is '{}'",
                receiver.name(),
                config.signal_name
            )));
        }
        let dispatcher = BatchDispatcher::new(processor, config.dispatch_timeout.into());
        let (query, handle) = query_channel(PendingSnapshot::default());
        Ok(Self {
            config,
            dispatcher,
            receiver,
            checkpoint: Checkpoint::initial(),
            query,
            handle,
            on_checkpoint: None,
            cycles_completed: 0,
            in_flight: false,
        })
    }

    /// Starts from a previously persisted checkpoint instead of an empty one.
    pub fn resume_from(mut self, checkpoint: Checkpoint) -> Self {
        self.query.publish(PendingSnapshot {
            pending: checkpoint.pending.clone(),
            generation: checkpoint.generation,
            ..Default::default()
        });
        self.checkpoint = checkpoint;
        self.in_flight = false;
        self
    }

    /// Registers a callback that receives every new checkpoint.
    pub fn on_checkpoint<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Checkpoint) + Send + Sync + 'static,
    {
        self.on_checkpoint = Some(Box::new(hook));
        self
    }

    /// Returns a read-only handle on the pending items.
    pub fn query_handle(&self) -> QueryHandle {
        self.handle.clone()
    }

    /// The checkpoint the next instance will start from.
    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }

    /// Runs one instance through one dispatch cycle.
    ///
    /// On failure the error is returned and the checkpoint is set to the
    /// failed instance's residual `pending`, which includes the failed batch
    /// only under the re-queue policy. A host may call this again to resume.
    ///
    /// If a previous call was dropped before it finished, the items that
    /// instance had taken from the channel are recovered from its last
    /// published snapshot before the next instance starts. A batch that was
    /// already handed to the processor is not recovered.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, BatcherError> {
        if self.in_flight {
            self.recover_abandoned();
        }
        self.in_flight = true;

        let generation = self.checkpoint.generation;
        let accumulator = Accumulator::new(
            self.checkpoint.clone(),
            &mut self.receiver,
            self.dispatcher.clone(),
            &self.query,
            self.config.clone(),
        );

        let outcome = accumulator.run().await;
        self.in_flight = false;
        match outcome {
            Ok(continuation) => Ok(self.continue_as_new(generation, continuation)),
            Err(error) => {
                let residual = Checkpoint::new(generation + 1, self.handle.current_pending());
                tracing::error!(
                    generation,
                    error = %error,
                    reason = ?error.termination_reason(),
                    residual = residual.len(),
                    "Batcher instance terminated"
                );
                self.checkpoint = residual;
                Err(error)
            }
        }
    }

    /// Runs `cycles` dispatch cycles, stopping at the first failure.
    pub async fn run_cycles(&mut self, cycles: usize) -> Result<Vec<CycleReport>, BatcherError> {
        let mut reports = Vec::with_capacity(cycles);
        for _ in 0..cycles {
            reports.push(self.run_cycle().await?);
        }
        Ok(reports)
    }

    /// Runs cycles forever. Only returns when an instance fails.
    pub async fn run(&mut self) -> Result<Infallible, BatcherError> {
        tracing::info!(
            signal = %self.config.signal_name,
            generation = self.checkpoint.generation,
            "Batcher supervisor started"
        );
        loop {
            self.run_cycle().await?;
        }
    }

    /// Rebuilds the checkpoint from the snapshot of an instance that was dropped mid-cycle.
    fn recover_abandoned(&mut self) {
        let snapshot = self.handle.snapshot();
        let residual = Checkpoint::new(snapshot.generation + 1, snapshot.pending);
        tracing::warn!(
            generation = snapshot.generation,
            phase = ?snapshot.phase,
            recovered = residual.len(),
            "Previous batcher instance was abandoned, recovering its pending items"
        );
        self.checkpoint = residual;
    }

    fn continue_as_new(&mut self, generation: u64, continuation: Continuation) -> CycleReport {
        let Continuation {
            checkpoint,
            dispatched,
            events_observed,
        } = continuation;

        if let Some(hook) = &self.on_checkpoint {
            hook(&checkpoint);
        }
        self.cycles_completed += 1;
        let carried_over = checkpoint.len();
        tracing::debug!(
            generation,
            next_generation = checkpoint.generation,
            carried_over,
            cycles_completed = self.cycles_completed,
            "Continuing as new"
        );
        self.checkpoint = checkpoint;

        CycleReport {
            generation,
            dispatched,
            carried_over,
            events_observed,
        }
    }
}

impl std::fmt::Debug for BatcherSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatcherSupervisor")
            .field("config", &self.config)
            .field("checkpoint", &self.checkpoint)
            .field("cycles_completed", &self.cycles_completed)
            .field("in_flight", &self.in_flight)
            .field("on_checkpoint", &self.on_checkpoint.is_some())
            .finish_non_exhaustive()
    }
}
