//! The three pipeline loops a started router runs, one thread each.
//!
//! ```text
//! transporter.recv ─▶ ingest ─▶ intake ─▶ dispatch ─▶ handler / delivery
//! send / Outbox ─▶ outgoing ─▶ egress ─▶ transporter.send
//! ```
//!
//! Every loop checks the stop signal between iterations and races it against
//! blocking channel operations. Errors on individual messages are logged and
//! the message is dropped; only the stop signal or a shut-down transporter
//! ends a loop.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Receiver, Sender};
use tagwire_codec::{Codec, Format, Message};
use tagwire_transport::{StopSignal, TransportError, Transporter};
use tracing::{debug, error, trace, warn};

use crate::error::{Result, RouterError};
use crate::outbox::{Outgoing, RegisteredSet};

/// Callback run on the dispatch thread for one message kind.
pub type Handler<M> = Box<dyn FnMut(&M) + Send + 'static>;

pub(crate) fn spawn<F>(name: &'static str, body: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map_err(|source| RouterError::Spawn { name, source })
}

/// Reads frames from the transporter, decodes them, feeds the intake buffer.
pub(crate) struct Ingest<M: Message, F> {
    pub(crate) codec: Arc<Codec<M, F>>,
    pub(crate) transporter: Arc<dyn Transporter>,
    pub(crate) intake: Sender<M>,
    pub(crate) stop: StopSignal,
}

impl<M: Message, F: Format<M>> Ingest<M, F> {
    pub(crate) fn run(self) {
        debug!("ingest stage running");
        while !self.stop.is_triggered() {
            let frame = match self.transporter.recv() {
                Ok(frame) => frame,
                Err(TransportError::Shutdown) => {
                    if !self.stop.is_triggered() {
                        warn!("transporter shut down under a running router");
                    }
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "transporter recv failed");
                    continue;
                }
            };

            let msg = match self.codec.unmarshal(&frame) {
                Ok(msg) => msg,
                Err(err) => {
                    warn!(error = %err, len = frame.len(), "dropping undecodable frame");
                    continue;
                }
            };
            trace!(kind = ?msg.kind(), len = frame.len(), "decoded frame");

            select! {
                send(self.intake, msg) -> res => {
                    if res.is_err() {
                        break;
                    }
                }
                recv(self.stop.receiver()) -> _ => break,
            }
        }
        debug!("ingest stage exited");
    }
}

/// Routes decoded messages to handlers and the delivery buffer.
pub(crate) struct Dispatch<M: Message> {
    pub(crate) intake: Receiver<M>,
    pub(crate) delivery: Option<Sender<M>>,
    pub(crate) handlers: HashMap<M::Kind, Handler<M>>,
    pub(crate) registered: RegisteredSet<M::Kind>,
    pub(crate) stop: StopSignal,
}

impl<M: Message> Dispatch<M> {
    pub(crate) fn run(mut self) {
        debug!(
            handlers = self.handlers.len(),
            pull = self.delivery.is_some(),
            "dispatch stage running"
        );
        while !self.stop.is_triggered() {
            let msg = select! {
                recv(self.intake) -> msg => match msg {
                    Ok(msg) => msg,
                    Err(_) => break,
                },
                recv(self.stop.receiver()) -> _ => break,
            };
            if !self.dispatch(msg) {
                break;
            }
        }
        // Dropping `self.delivery` here closes the buffer for `recv`.
        debug!("dispatch stage exited");
    }

    /// Returns `false` when the loop should end.
    fn dispatch(&mut self, msg: M) -> bool {
        let kind = msg.kind();
        let registered = self
            .registered
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&kind);
        if !registered {
            warn!(?kind, "dropping message of unregistered kind");
            return true;
        }

        let handled = match self.handlers.get_mut(&kind) {
            Some(handler) => {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(&msg)));
                if outcome.is_err() {
                    error!(?kind, "message handler panicked");
                }
                true
            }
            None => false,
        };

        let Some(delivery) = &self.delivery else {
            if !handled {
                debug!(?kind, "no handler and pull delivery disabled, dropping message");
            }
            return true;
        };
        select! {
            send(delivery, msg) -> res => res.is_ok(),
            recv(self.stop.receiver()) -> _ => false,
        }
    }
}

/// Encodes queued messages and hands the frames to the transporter.
pub(crate) struct Egress<M: Message, F> {
    pub(crate) codec: Arc<Codec<M, F>>,
    pub(crate) transporter: Arc<dyn Transporter>,
    pub(crate) outgoing: Receiver<Outgoing<M>>,
    pub(crate) in_flight: Arc<AtomicUsize>,
    pub(crate) stop: StopSignal,
}

impl<M: Message, F: Format<M>> Egress<M, F> {
    pub(crate) fn run(self) {
        debug!("egress stage running");
        while !self.stop.is_triggered() {
            let Outgoing {
                destination,
                message,
            } = select! {
                recv(self.outgoing) -> item => match item {
                    Ok(item) => item,
                    Err(_) => break,
                },
                recv(self.stop.receiver()) -> _ => break,
            };

            self.deliver(&destination, &message);
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
        }
        debug!("egress stage exited");
    }

    fn deliver(&self, destination: &str, message: &M) {
        let kind = message.kind();
        let frame = match self.codec.marshal(message) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(destination, ?kind, error = %err, "dropping unencodable message");
                return;
            }
        };
        match self.transporter.send(destination, &frame) {
            Ok(()) => trace!(destination, ?kind, len = frame.len(), "sent frame"),
            Err(err) => warn!(destination, ?kind, error = %err, "transporter send failed"),
        }
    }
}
