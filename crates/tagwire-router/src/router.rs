use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, SendError, Sender, TryRecvError};
use tagwire_codec::{Codec, Format, JsonFormat, Message, TypeTag};
use tagwire_transport::{StopSignal, Transporter};
use tracing::{debug, info, warn};

use crate::config::RouterConfig;
use crate::error::{Result, RouterError};
use crate::outbox::{Outbox, Outgoing, RegisteredSet};
use crate::stages::{self, Dispatch, Egress, Handler, Ingest};
use crate::state::RouterState;

const FLUSH_POLL: Duration = Duration::from_millis(5);

/// Typed messaging endpoint over a [`Transporter`].
///
/// A router owns a codec and a transporter. Once started it runs three
/// threads: ingest (transporter → decode → intake buffer), dispatch (intake
/// → handlers and/or the delivery buffer) and egress (outgoing buffer →
/// encode → transporter). [`send`](Self::send) only enqueues;
/// [`recv`](Self::recv) pulls from the delivery buffer.
///
/// Messages and handlers are registered before [`start`](Self::start). Two
/// routers talking to each other must register the same kinds in the same
/// order, since that order fixes the wire tags.
pub struct Router<M: Message, F = JsonFormat> {
    config: RouterConfig,
    codec: Arc<Codec<M, F>>,
    transporter: Arc<dyn Transporter>,
    registered: RegisteredSet<M::Kind>,
    handlers: Mutex<HashMap<M::Kind, Handler<M>>>,
    outbox: Outbox<M>,
    outgoing: Receiver<Outgoing<M>>,
    in_flight: Arc<AtomicUsize>,
    delivery_tx: Mutex<Option<Sender<M>>>,
    delivery_rx: Option<Receiver<M>>,
    stop: StopSignal,
    state: Mutex<RouterState>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl<M: Message, F: Format<M>> Router<M, F> {
    /// Router with default capacities.
    ///
    /// Fails with [`RouterError::NoDeliveryMode`] when both delivery modes
    /// are off.
    pub fn new(
        codec: Codec<M, F>,
        transporter: Arc<dyn Transporter>,
        enable_recv: bool,
        enable_handler: bool,
    ) -> Result<Self> {
        Self::with_config(
            codec,
            transporter,
            RouterConfig::new(enable_recv, enable_handler),
        )
    }

    pub fn with_config(
        codec: Codec<M, F>,
        transporter: Arc<dyn Transporter>,
        config: RouterConfig,
    ) -> Result<Self> {
        config.validate()?;

        let stop = StopSignal::new();
        let registered: RegisteredSet<M::Kind> = Arc::new(RwLock::new(HashSet::new()));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let (outgoing_tx, outgoing_rx) = crossbeam_channel::bounded(config.outgoing_capacity);
        let (delivery_tx, delivery_rx) = if config.enable_recv {
            let (tx, rx) = crossbeam_channel::bounded(config.delivery_capacity);
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        Ok(Self {
            codec: Arc::new(codec),
            transporter,
            outbox: Outbox::new(
                outgoing_tx,
                Arc::clone(&registered),
                Arc::clone(&in_flight),
                stop.clone(),
            ),
            registered,
            handlers: Mutex::new(HashMap::new()),
            outgoing: outgoing_rx,
            in_flight,
            delivery_tx: Mutex::new(delivery_tx),
            delivery_rx,
            stop,
            state: Mutex::new(RouterState::Created),
            threads: Mutex::new(Vec::new()),
            config,
        })
    }

    /// Register the kind of `sample` with the router and its codec.
    ///
    /// Returns the wire tag the codec assigned.
    pub fn register_message(&mut self, sample: &M) -> Result<TypeTag> {
        self.ensure_created("register a message on")?;

        let kind = sample.kind();
        if self.is_registered(kind) {
            return Err(RouterError::AlreadyRegistered {
                kind: format!("{kind:?}"),
            });
        }

        let state = self.state();
        let codec = Arc::get_mut(&mut self.codec).ok_or(RouterError::InvalidState {
            operation: "register a message on",
            state,
        })?;
        let tag = codec.register_message(sample)?;

        self.registered
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind);
        debug!(?kind, %tag, "router registered message kind");
        Ok(tag)
    }

    /// Start the transporter and the pipeline threads.
    ///
    /// The transporter's `start` runs on its own thread. If it fails within
    /// [`RouterConfig::prepare_period`] the error is returned and no stage is
    /// launched; a transporter that is still serving when the period ends is
    /// assumed healthy.
    pub fn start(&mut self) -> Result<()> {
        self.ensure_created("start")?;
        self.codec.initialize()?;
        self.start_transporter()?;

        if let Err(err) = self.launch_stages() {
            warn!(error = %err, "router failed to launch its stages");
            if let Err(stop_err) = self.stop() {
                warn!(error = %stop_err, "failed to stop transporter after launch failure");
            }
            return Err(err);
        }

        *lock(&self.state) = RouterState::Started;
        info!(
            kinds = self.codec.len(),
            pull = self.config.enable_recv,
            handlers = self.config.enable_handler,
            "router started"
        );
        Ok(())
    }

    fn start_transporter(&self) -> Result<()> {
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);
        let transporter = Arc::clone(&self.transporter);
        let handle = stages::spawn("tagwire-transport", move || {
            let result = transporter.start();
            if let Err(SendError(Err(err))) = result_tx.send(result) {
                warn!(error = %err, "transporter stopped serving with an error");
            }
        })?;
        lock(&self.threads).push(handle);

        match result_rx.recv_timeout(self.config.prepare_period) {
            Ok(Ok(())) => {
                debug!("transporter start returned");
                Ok(())
            }
            Ok(Err(err)) => Err(err.into()),
            Err(RecvTimeoutError::Timeout) => {
                debug!(period = ?self.config.prepare_period, "transporter serving");
                Ok(())
            }
            Err(RecvTimeoutError::Disconnected) => Err(RouterError::StartAborted),
        }
    }

    fn launch_stages(&mut self) -> Result<()> {
        let (intake_tx, intake_rx) = crossbeam_channel::bounded(self.config.intake_capacity);

        let ingest = Ingest {
            codec: Arc::clone(&self.codec),
            transporter: Arc::clone(&self.transporter),
            intake: intake_tx,
            stop: self.stop.clone(),
        };
        let dispatch = Dispatch {
            intake: intake_rx,
            delivery: lock(&self.delivery_tx).take(),
            handlers: std::mem::take(
                self.handlers
                    .get_mut()
                    .unwrap_or_else(PoisonError::into_inner),
            ),
            registered: Arc::clone(&self.registered),
            stop: self.stop.clone(),
        };
        let egress = Egress {
            codec: Arc::clone(&self.codec),
            transporter: Arc::clone(&self.transporter),
            outgoing: self.outgoing.clone(),
            in_flight: Arc::clone(&self.in_flight),
            stop: self.stop.clone(),
        };

        let mut threads = lock(&self.threads);
        threads.push(stages::spawn("tagwire-dispatch", move || dispatch.run())?);
        threads.push(stages::spawn("tagwire-egress", move || egress.run())?);
        threads.push(stages::spawn("tagwire-ingest", move || ingest.run())?);
        Ok(())
    }

    /// Queue `msg` for `destination`. Blocks while the outgoing buffer is full.
    pub fn send(&self, destination: &str, msg: M) -> Result<()> {
        self.outbox.send(destination, msg)
    }
}

impl<M: Message, F> Router<M, F> {
    /// Register `handler` for messages of `kind`.
    ///
    /// Handlers run on the dispatch thread in arrival order. A panicking
    /// handler is logged and dispatch continues.
    pub fn register_handler<H>(&mut self, kind: M::Kind, handler: H) -> Result<()>
    where
        H: FnMut(&M) + Send + 'static,
    {
        if !self.config.enable_handler {
            return Err(RouterError::HandlerDisabled);
        }
        self.ensure_created("register a handler on")?;

        let handlers = self
            .handlers
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(&kind) {
            return Err(RouterError::AlreadyRegistered {
                kind: format!("{kind:?}"),
            });
        }
        handlers.insert(kind, Box::new(handler));
        debug!(?kind, "registered message handler");
        Ok(())
    }

    /// Next delivered message. Blocks until one is available.
    pub fn recv(&self) -> Result<M> {
        self.delivery()?.recv().map_err(|_| RouterError::Closed)
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<M> {
        self.delivery()?
            .recv_timeout(timeout)
            .map_err(|err| match err {
                RecvTimeoutError::Timeout => RouterError::Timeout(timeout),
                RecvTimeoutError::Disconnected => RouterError::Closed,
            })
    }

    /// Next delivered message if one is already buffered.
    pub fn try_recv(&self) -> Result<Option<M>> {
        match self.delivery()?.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(RouterError::Closed),
        }
    }

    fn delivery(&self) -> Result<&Receiver<M>> {
        self.delivery_rx.as_ref().ok_or(RouterError::RecvDisabled)
    }

    /// Handle for sending from handlers or other threads.
    pub fn outbox(&self) -> Outbox<M> {
        self.outbox.clone()
    }

    /// Wait until every queued message has been handed to the transporter.
    ///
    /// Send failures inside the egress stage are logged, not reported here.
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while self.outbox.pending() > 0 {
            if self.stop.is_triggered() {
                return Err(RouterError::Stopped);
            }
            if Instant::now() >= deadline {
                return Err(RouterError::Timeout(timeout));
            }
            thread::sleep(FLUSH_POLL);
        }
        Ok(())
    }

    /// Fire the stop signal and stop the transporter.
    ///
    /// Stages exit at their next iteration boundary; in-flight handlers are
    /// not awaited. Calling `stop` again is a no-op.
    pub fn stop(&self) -> Result<()> {
        {
            let mut state = lock(&self.state);
            if state.is_stopped() {
                return Ok(());
            }
            self.stop.trigger();
            // A router that never started still holds the delivery sender.
            lock(&self.delivery_tx).take();
            *state = RouterState::Stopped;
        }
        info!("router stopped");
        self.transporter.stop()?;
        Ok(())
    }

    /// Stop if needed, then destroy the codec and the transporter.
    ///
    /// Both are attempted even if one fails; the first failure is returned.
    /// Stage threads still blocked inside the transporter are not joined.
    pub fn destroy(&self) -> Result<()> {
        if *lock(&self.state) == RouterState::Destroyed {
            return Ok(());
        }

        let stopped = self.stop();
        let codec = self.codec.destroy();
        let transporter = self.transporter.destroy();
        *lock(&self.state) = RouterState::Destroyed;
        self.reap_threads();
        info!("router destroyed");

        stopped?;
        codec?;
        transporter?;
        Ok(())
    }

    fn reap_threads(&self) {
        let mut threads = lock(&self.threads);
        let (finished, running): (Vec<_>, Vec<_>) =
            threads.drain(..).partition(|handle| handle.is_finished());
        for handle in finished {
            if handle.join().is_err() {
                warn!("router thread panicked");
            }
        }
        if !running.is_empty() {
            debug!(running = running.len(), "leaving router threads to wind down");
        }
        *threads = running;
    }

    pub fn state(&self) -> RouterState {
        *lock(&self.state)
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn codec(&self) -> &Codec<M, F> {
        &self.codec
    }

    pub fn is_registered(&self, kind: M::Kind) -> bool {
        self.outbox.is_registered(kind)
    }

    fn ensure_created(&self, operation: &'static str) -> Result<()> {
        match self.state() {
            RouterState::Created => Ok(()),
            state => Err(RouterError::InvalidState { operation, state }),
        }
    }
}

impl<M: Message, F> Drop for Router<M, F> {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!(error = %err, "failed to stop router on drop");
        }
    }
}

impl<M: Message, F> std::fmt::Debug for Router<M, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("state", &self.state())
            .field("config", &self.config)
            .field("codec", &self.codec)
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
