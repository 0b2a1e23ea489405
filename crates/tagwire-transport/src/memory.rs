//! In-process transporter: a shared address book of bounded inboxes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use crossbeam_channel::{select, Receiver, Sender};
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::signal::StopSignal;
use crate::transporter::Transporter;

/// Default inbox capacity per bound address.
pub const DEFAULT_INBOX_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Payloads buffered per address before senders block.
    pub inbox_capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
        }
    }
}

/// Address book shared by every [`MemoryTransporter`] bound from it.
#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    inboxes: Arc<Mutex<HashMap<String, Sender<Bytes>>>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transporter for `address`. The address is claimed on `start`.
    pub fn bind(&self, address: impl Into<String>) -> MemoryTransporter {
        self.bind_with_config(address, MemoryConfig::default())
    }

    pub fn bind_with_config(
        &self,
        address: impl Into<String>,
        config: MemoryConfig,
    ) -> MemoryTransporter {
        let (inbox_tx, inbox_rx) = crossbeam_channel::bounded(config.inbox_capacity);
        MemoryTransporter {
            address: address.into(),
            network: self.clone(),
            inbox_tx,
            inbox_rx,
            stop: StopSignal::new(),
        }
    }

    /// Whether a started transporter currently serves `address`.
    pub fn is_bound(&self, address: &str) -> bool {
        self.inboxes().contains_key(address)
    }

    fn inboxes(&self) -> MutexGuard<'_, HashMap<String, Sender<Bytes>>> {
        self.inboxes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Transporter that delivers payloads through a [`MemoryNetwork`].
///
/// `start` returns immediately once the address is claimed.
#[derive(Debug)]
pub struct MemoryTransporter {
    address: String,
    network: MemoryNetwork,
    inbox_tx: Sender<Bytes>,
    inbox_rx: Receiver<Bytes>,
    stop: StopSignal,
}

impl MemoryTransporter {
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Transporter for MemoryTransporter {
    fn start(&self) -> Result<()> {
        if self.stop.is_triggered() {
            return Err(TransportError::Shutdown);
        }
        let mut inboxes = self.network.inboxes();
        if inboxes.contains_key(&self.address) {
            return Err(TransportError::AddressInUse(self.address.clone()));
        }
        inboxes.insert(self.address.clone(), self.inbox_tx.clone());
        debug!(address = %self.address, "memory transporter started");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        if !self.stop.trigger() {
            return Ok(());
        }
        let mut inboxes = self.network.inboxes();
        let ours = inboxes
            .get(&self.address)
            .is_some_and(|tx| tx.same_channel(&self.inbox_tx));
        if ours {
            inboxes.remove(&self.address);
        }
        debug!(address = %self.address, "memory transporter stopped");
        Ok(())
    }

    fn destroy(&self) -> Result<()> {
        self.stop()
    }

    fn send(&self, destination: &str, payload: &[u8]) -> Result<()> {
        if self.stop.is_triggered() {
            return Err(TransportError::Shutdown);
        }
        let target = self
            .network
            .inboxes()
            .get(destination)
            .cloned()
            .ok_or_else(|| TransportError::Unreachable(destination.to_string()))?;

        select! {
            send(target, Bytes::copy_from_slice(payload)) -> res => {
                res.map_err(|_| TransportError::Unreachable(destination.to_string()))
            }
            recv(self.stop.receiver()) -> _ => Err(TransportError::Shutdown),
        }
    }

    fn recv(&self) -> Result<Bytes> {
        select! {
            recv(self.inbox_rx) -> payload => payload.map_err(|_| TransportError::Shutdown),
            recv(self.stop.receiver()) -> _ => Err(TransportError::Shutdown),
        }
    }
}
