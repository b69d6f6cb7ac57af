//! Event selector over the signal channel and the deadline timer.

use crate::error::BatcherError;
use crate::signal::SignalReceiver;
use crate::timer::DeadlineTimer;
use crate::types::WorkItemId;

/// Exactly one satisfied event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A work item was signalled.
    ItemArrived(WorkItemId),
    /// The quiescence interval elapsed with no cut.
    DeadlineFired,
}

/// Waits for whichever of {arrival, deadline} is ready first.
///
/// The selector borrows the signal receiver for the life of one accumulator
/// instance; the next instance builds a fresh selector over the same receiver.
#[derive(Debug)]
pub struct EventSelector<'a> {
    receiver: &'a mut SignalReceiver,
}

impl<'a> EventSelector<'a> {
    pub fn new(receiver: &'a mut SignalReceiver) -> Self {
        Self { receiver }
    }

    /// Blocks until an arrival or the deadline is ready and returns one event.
    ///
    /// Arrivals win ties. The losing source is not consumed: an unread arrival
    /// stays in the channel and a passed deadline stays armed, so the next call
    /// returns it.
    pub async fn await_next(&mut self, timer: &mut DeadlineTimer) -> Result<Event, BatcherError> {
        tokio::select! {
            biased;

            arrival = self.receiver.recv() => arrival.map(Event::ItemArrived),
            () = timer.fired() => Ok(Event::DeadlineFired),
        }
    }

    /// Returns an already-delivered arrival without waiting.
    pub fn try_next_arrival(&mut self) -> Option<WorkItemId> {
        self.receiver.try_recv()
    }
}
