use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender, TryRecvError};

/// One-shot broadcast used to tell running loops to wind down.
///
/// Firing drops the only sender, so every clone of the receiver observes a
/// disconnected channel: readable by any number of threads, written once,
/// never blocking after it fires. Loops can wait on it inside
/// `crossbeam_channel::select!` through [`receiver`](StopSignal::receiver).
#[derive(Debug, Clone)]
pub struct StopSignal {
    trigger: Arc<Mutex<Option<Sender<()>>>>,
    observed: Receiver<()>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(0);
        Self {
            trigger: Arc::new(Mutex::new(Some(tx))),
            observed: rx,
        }
    }

    /// Fire the signal. Returns `true` only for the call that fired it.
    pub fn trigger(&self) -> bool {
        self.trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    /// Whether the signal has fired.
    pub fn is_triggered(&self) -> bool {
        matches!(self.observed.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Receiver that becomes ready (disconnected) once the signal fires.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.observed
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}
