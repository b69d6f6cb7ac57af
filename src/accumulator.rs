//! The batch-accumulation state machine.
//!
//! One [`Accumulator`] lives for exactly one dispatch cycle:
//!
//! 1. **AwaitingFirstEvent**: inherited items are evaluated before any wait.
//! 2. **WaitingForTrigger**: arrivals are appended and deadlines noted until a
//!    trigger fires (more than `batch_size` items, or the deadline with items
//!    pending).
//! 3. **Dispatching**: the cut batch goes to the processor.
//! 4. **Checkpointing**: arrivals already delivered are folded into `pending`
//!    and the instance returns a [`Continuation`] seeding its successor.
//!
//! The instance is consumed by [`Accumulator::run`], so two live instances can
//! never own the same `pending` items.

use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::checkpoint::Checkpoint;
use crate::config::BatcherConfig;
use crate::dispatcher::BatchDispatcher;
use crate::error::BatcherError;
use crate::query::{PendingSnapshot, QueryPublisher};
use crate::queue::ItemQueue;
use crate::selector::{Event, EventSelector};
use crate::signal::SignalReceiver;
use crate::timer::DeadlineTimer;
use crate::types::{Batch, InstanceId, WorkItemId};

/// Lifecycle phase of one accumulator instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccumulatorPhase {
    AwaitingFirstEvent,
    WaitingForTrigger,
    Dispatching,
    Checkpointing,
}

/// Outcome of evaluating the trigger conditions after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The deadline passed with nothing pending: re-arm and keep waiting.
    ResetTimer,
    /// A trigger fired: cut a batch and dispatch it.
    Cut,
    /// No trigger yet.
    Wait,
}

/// Decides what the control loop does next.
///
/// The empty-deadline case is checked first so an idle deadline neither
/// dispatches an empty batch nor leaves the timer disarmed. The size trigger
/// is strictly greater than `batch_size`.
pub fn evaluate(timer_expired: bool, pending_len: usize, batch_size: usize) -> Decision {
    if timer_expired && pending_len == 0 {
        Decision::ResetTimer
    } else if timer_expired || pending_len > batch_size {
        Decision::Cut
    } else {
        Decision::Wait
    }
}

/// Result of a completed cycle: everything the successor needs.
#[derive(Debug)]
pub struct Continuation {
    /// Residual state for the successor instance.
    pub checkpoint: Checkpoint,
    /// The batch as returned by the processor.
    pub dispatched: Batch,
    /// Events the instance consumed from its selector, including drained arrivals.
    pub events_observed: u64,
}

/// One accumulator instance.
pub struct Accumulator<'a> {
    id: InstanceId,
    generation: u64,
    config: BatcherConfig,
    phase: AccumulatorPhase,
    queue: ItemQueue,
    timer: DeadlineTimer,
    timer_expired: bool,
    selector: EventSelector<'a>,
    dispatcher: BatchDispatcher,
    query: &'a QueryPublisher,
    events_observed: u64,
}

impl<'a> Accumulator<'a> {
    /// Builds an instance seeded from `checkpoint`, in `AwaitingFirstEvent`.
    ///
    /// The inherited items are published to `query` immediately.
    pub fn new(
        checkpoint: Checkpoint,
        receiver: &'a mut SignalReceiver,
        dispatcher: BatchDispatcher,
        query: &'a QueryPublisher,
        config: BatcherConfig,
    ) -> Self {
        let accumulator = Self {
            id: InstanceId::new_v4(),
            generation: checkpoint.generation,
            config,
            phase: AccumulatorPhase::AwaitingFirstEvent,
            queue: ItemQueue::from_items(checkpoint.pending),
            timer: DeadlineTimer::new(),
            timer_expired: false,
            selector: EventSelector::new(receiver),
            dispatcher,
            query,
            events_observed: 0,
        };
        accumulator.publish();
        accumulator
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> AccumulatorPhase {
        self.phase
    }

    /// Returns the live pending items without changing state.
    pub fn current_pending(&self) -> Vec<WorkItemId> {
        self.queue.snapshot()
    }

    /// Runs the instance through one dispatch cycle.
    ///
    /// Returns the continuation for the successor, or the error that ended
    /// the cycle. Under [`DispatchFailurePolicy::Requeue`] a failed batch is
    /// restored at the front of `pending` and published before returning.
    ///
    /// [`DispatchFailurePolicy::Requeue`]: crate::config::DispatchFailurePolicy::Requeue
    pub async fn run(self) -> Result<Continuation, BatcherError> {
        let span = tracing::info_span!(
            "batcher_instance",
            instance_id = %self.id,
            generation = self.generation,
        );
        self.run_cycle().instrument(span).await
    }

    async fn run_cycle(mut self) -> Result<Continuation, BatcherError> {
        tracing::info!(
            inherited = self.queue.len(),
            batch_size = self.config.batch_size,
            quiescence_secs = self.config.quiescence_interval.to_seconds(),
            "Batcher instance started"
        );
        self.timer.arm(self.config.quiescence_interval.into());
        self.publish();

        let batch = self.accumulate().await?;
        let dispatched = self.dispatch(batch).await?;
        Ok(self.checkpoint(dispatched))
    }

    /// Waits for events until a trigger fires, then cuts a batch.
    async fn accumulate(&mut self) -> Result<Batch, BatcherError> {
        loop {
            if self.phase == AccumulatorPhase::AwaitingFirstEvent {
                tracing::debug!("Initial run, evaluating inherited items before waiting");
                self.phase = AccumulatorPhase::WaitingForTrigger;
            } else {
                tracing::debug!(signal = %self.config.signal_name, "Waiting for signal");
                let event = self.selector.await_next(&mut self.timer).await?;
                self.events_observed += 1;
                match event {
                    Event::ItemArrived(id) => self.append(id),
                    Event::DeadlineFired => {
                        tracing::debug!(pending = self.queue.len(), "Deadline fired");
                        self.timer_expired = true;
                    }
                }
                self.publish();
            }

            match evaluate(self.timer_expired, self.queue.len(), self.config.batch_size) {
                Decision::ResetTimer => {
                    tracing::info!("Resetting timer as there are no items to process");
                    self.timer_expired = false;
                    self.timer.arm(self.config.quiescence_interval.into());
                    self.publish();
                }
                Decision::Cut => {
                    let batch = self.queue.cut(self.config.batch_size);
                    tracing::info!(
                        batch_len = batch.len(),
                        remaining = self.queue.len(),
                        deadline = self.timer_expired,
                        "Batch trigger reached, cutting batch"
                    );
                    return Ok(batch);
                }
                Decision::Wait => {}
            }
        }
    }

    async fn dispatch(&mut self, batch: Batch) -> Result<Batch, BatcherError> {
        self.phase = AccumulatorPhase::Dispatching;
        self.timer.disarm();
        self.publish();

        let retained = self
            .config
            .on_dispatch_failure
            .is_requeue()
            .then(|| batch.clone());

        match self.dispatcher.dispatch(batch).await {
            Ok(processed) => Ok(processed),
            Err(error) => match retained {
                Some(batch) => {
                    tracing::warn!(
                        batch_len = batch.len(),
                        error = %error,
                        "Dispatch failed, re-queueing batch before terminating"
                    );
                    self.queue.requeue_front(batch);
                    self.publish();
                    Err(error.into_requeued())
                }
                None => {
                    tracing::error!(error = %error, "Dispatch failed, batch discarded");
                    Err(error)
                }
            },
        }
    }

    /// Folds already-delivered arrivals into `pending` and hands it on.
    fn checkpoint(mut self, dispatched: Batch) -> Continuation {
        self.phase = AccumulatorPhase::Checkpointing;

        let mut drained = 0usize;
        while let Some(id) = self.selector.try_next_arrival() {
            self.events_observed += 1;
            drained += 1;
            self.append(id);
        }
        self.publish();

        let carried = self.queue.len();
        let checkpoint = Checkpoint::new(self.generation + 1, self.queue.into_vec());
        tracing::info!(
            dispatched = dispatched.len(),
            drained,
            carried,
            events_observed = self.events_observed,
            "Batch cycle completed, continuing as new"
        );

        Continuation {
            checkpoint,
            dispatched,
            events_observed: self.events_observed,
        }
    }

    fn append(&mut self, id: WorkItemId) {
        if id.is_empty() {
            tracing::debug!("Ignoring empty work item id");
            return;
        }
        tracing::debug!(item = %id, "Received signal");
        self.queue.push(id);
    }

    fn publish(&self) {
        self.query.publish(PendingSnapshot {
            pending: self.queue.snapshot(),
            timer_armed_at: self.timer.armed_at(),
            generation: self.generation,
            phase: self.phase,
        });
    }
}

impl std::fmt::Debug for Accumulator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accumulator")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("phase", &self.phase)
            .field("pending", &self.queue.len())
            .field("timer_armed", &self.timer.is_armed())
            .finish_non_exhaustive()
    }
}
