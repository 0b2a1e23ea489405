use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crossbeam_channel::{select, Sender};
use tagwire_codec::Message;
use tagwire_transport::StopSignal;
use tracing::trace;

use crate::error::{Result, RouterError};

/// Kinds a router may send and dispatch, shared with every [`Outbox`].
pub(crate) type RegisteredSet<K> = Arc<RwLock<HashSet<K>>>;

/// A message waiting for the egress stage.
pub(crate) struct Outgoing<M> {
    pub(crate) destination: String,
    pub(crate) message: M,
}

/// Cloneable handle for sending through a router.
///
/// Obtained from [`Router::outbox`](crate::Router::outbox). Handlers use it to
/// reply from the dispatch thread, other threads to send without borrowing
/// the router. Sends block while the outgoing buffer is full and fail with
/// [`RouterError::Stopped`] once the router stops.
pub struct Outbox<M: Message> {
    outgoing: Sender<Outgoing<M>>,
    registered: RegisteredSet<M::Kind>,
    in_flight: Arc<AtomicUsize>,
    stop: StopSignal,
}

impl<M: Message> Outbox<M> {
    pub(crate) fn new(
        outgoing: Sender<Outgoing<M>>,
        registered: RegisteredSet<M::Kind>,
        in_flight: Arc<AtomicUsize>,
        stop: StopSignal,
    ) -> Self {
        Self {
            outgoing,
            registered,
            in_flight,
            stop,
        }
    }

    /// Queue `msg` for delivery to `destination`.
    pub fn send(&self, destination: &str, msg: M) -> Result<()> {
        let kind = msg.kind();
        if !self.is_registered(kind) {
            return Err(RouterError::UnregisteredType {
                kind: format!("{kind:?}"),
            });
        }
        if self.stop.is_triggered() {
            return Err(RouterError::Stopped);
        }

        let item = Outgoing {
            destination: destination.to_string(),
            message: msg,
        };
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let queued = select! {
            send(self.outgoing, item) -> res => res.map_err(|_| RouterError::Stopped),
            recv(self.stop.receiver()) -> _ => Err(RouterError::Stopped),
        };
        match queued {
            Ok(()) => trace!(destination, ?kind, "queued outgoing message"),
            Err(_) => {
                self.in_flight.fetch_sub(1, Ordering::AcqRel);
            }
        }
        queued
    }

    pub fn is_registered(&self, kind: M::Kind) -> bool {
        self.registered
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&kind)
    }

    /// Messages queued or still being handed to the transporter.
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl<M: Message> Clone for Outbox<M> {
    fn clone(&self) -> Self {
        Self {
            outgoing: self.outgoing.clone(),
            registered: Arc::clone(&self.registered),
            in_flight: Arc::clone(&self.in_flight),
            stop: self.stop.clone(),
        }
    }
}

impl<M: Message> std::fmt::Debug for Outbox<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbox")
            .field("pending", &self.pending())
            .field("stopped", &self.stop.is_triggered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Beat {
        Tick(u32),
        Tock,
    }

    impl Message for Beat {
        type Kind = bool;

        fn kind(&self) -> bool {
            matches!(self, Beat::Tick(_))
        }
    }

    type Queue = crossbeam_channel::Receiver<Outgoing<Beat>>;

    fn outbox(capacity: usize) -> (Outbox<Beat>, Queue, StopSignal) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        let registered = Arc::new(RwLock::new(HashSet::from([true])));
        let stop = StopSignal::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        (Outbox::new(tx, registered, in_flight, stop.clone()), rx, stop)
    }

    #[test]
    fn queues_registered_kinds() {
        let (outbox, rx, _stop) = outbox(4);
        outbox.send("peer", Beat::Tick(1)).expect("send should queue");
        assert_eq!(outbox.pending(), 1);

        let item = rx.try_recv().expect("item should be queued");
        assert_eq!(item.destination, "peer");
        assert_eq!(item.message, Beat::Tick(1));
    }

    #[test]
    fn rejects_unregistered_kind() {
        let (outbox, rx, _stop) = outbox(4);
        let result = outbox.send("peer", Beat::Tock);
        assert!(matches!(result, Err(RouterError::UnregisteredType { .. })));
        assert!(rx.is_empty());
    }

    #[test]
    fn stop_unblocks_full_buffer() {
        let (outbox, _rx, stop) = outbox(1);
        outbox.send("peer", Beat::Tick(1)).expect("first send fits");

        let blocked = thread::spawn(move || outbox.send("peer", Beat::Tick(2)));
        thread::sleep(Duration::from_millis(50));
        assert!(!blocked.is_finished());

        stop.trigger();
        let result = blocked.join().expect("sender thread should not panic");
        assert!(matches!(result, Err(RouterError::Stopped)));
    }

    #[test]
    fn send_after_stop_fails_fast() {
        let (outbox, rx, stop) = outbox(4);
        stop.trigger();
        assert!(matches!(
            outbox.send("peer", Beat::Tick(3)),
            Err(RouterError::Stopped)
        ));
        assert!(rx.is_empty());
    }
}
