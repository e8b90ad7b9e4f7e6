use crossbeam_channel::{select_biased, Receiver, SendError, Sender};

use crate::shared::error::TrackingError;

use super::cancellation::Cancellation;
use super::tracked_frame::TrackedFrame;

/// Result of handing a frame to the presentation side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    /// The run was cancelled before the frame could be queued; it was dropped.
    Abandoned,
}

/// Bounded FIFO between the pipeline and whoever displays its frames.
///
/// The producer blocks while the queue is full, which stalls the stages
/// behind it. The consumer never blocks.
pub fn handoff_queue(capacity: usize) -> (HandoffProducer, HandoffConsumer) {
    let capacity = capacity.max(1);
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (HandoffProducer { tx }, HandoffConsumer { rx, capacity })
}

pub struct HandoffProducer {
    tx: Sender<TrackedFrame>,
}

impl HandoffProducer {
    /// Waits for space, giving up as soon as `cancellation` fires.
    ///
    /// Cancellation wins over a slot that frees up at the same moment, so
    /// nothing is enqueued once the run has been cancelled.
    pub fn push(
        &self,
        frame: TrackedFrame,
        cancellation: &Cancellation,
    ) -> Result<PushOutcome, TrackingError> {
        if cancellation.is_cancelled() {
            return Ok(PushOutcome::Abandoned);
        }
        select_biased! {
            recv(cancellation.signal()) -> _ => Ok(PushOutcome::Abandoned),
            send(self.tx, frame) -> sent => match sent {
                Ok(()) => Ok(PushOutcome::Delivered),
                Err(SendError(frame)) => Err(TrackingError::Handoff(format!(
                    "consumer went away before frame {}",
                    frame.index()
                ))),
            },
        }
    }
}

/// Presentation-side end of the handoff queue.
#[derive(Clone)]
pub struct HandoffConsumer {
    rx: Receiver<TrackedFrame>,
    capacity: usize,
}

impl HandoffConsumer {
    /// Oldest ready frame, if any.
    pub fn try_pop(&self) -> Option<TrackedFrame> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
