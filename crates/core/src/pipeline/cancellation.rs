use std::sync::Mutex;

use crossbeam_channel::{Receiver, Sender, TryRecvError};

/// One-shot cancellation shared by every stage of a run.
///
/// Cancelling closes a channel nobody ever sends on, so a blocked stage can
/// wait on [`signal`](Self::signal) next to its real work in a `select!` and
/// wake the moment the run is cancelled.
pub struct Cancellation {
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl Cancellation {
    pub fn new() -> Self {
        let (trigger, signal) = crossbeam_channel::bounded(0);
        Self {
            trigger: Mutex::new(Some(trigger)),
            signal,
        }
    }

    /// Idempotent.
    pub fn cancel(&self) {
        let mut trigger = self
            .trigger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        trigger.take();
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.signal.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Becomes ready (disconnected) once the run is cancelled.
    pub fn signal(&self) -> &Receiver<()> {
        &self.signal
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}
