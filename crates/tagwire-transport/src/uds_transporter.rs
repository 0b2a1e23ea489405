use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::{select, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::error::{Result, TransportError};
use crate::memory::DEFAULT_INBOX_CAPACITY;
use crate::packet::PacketConfig;
use crate::signal::StopSignal;
use crate::stream::{PacketReader, PacketWriter};
use crate::transporter::Transporter;
use crate::uds::UnixDomainSocket;

/// Pause after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

type Tracked<K> = Mutex<HashMap<K, Connection>>;

#[derive(Debug, Clone)]
pub struct UdsConfig {
    /// Inbound payloads buffered before reader threads block.
    pub inbox_capacity: usize,
    /// Permission bits for the bound socket file.
    pub socket_mode: u32,
    /// Packet limits. The read timeout is ignored: readers block until the
    /// peer closes or the transporter stops.
    pub packet: PacketConfig,
}

impl Default for UdsConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            socket_mode: UnixDomainSocket::DEFAULT_SOCKET_MODE,
            packet: PacketConfig::default(),
        }
    }
}

/// Transporter over Unix domain sockets; addresses are socket paths.
///
/// [`start`](Transporter::start) binds the local path and serves accepted
/// connections until [`stop`](Transporter::stop); each connection gets a
/// reader thread feeding the shared inbox. Outbound connections are opened
/// lazily, one per destination, and dropped on the first write error.
///
/// Every live socket has a cloned handle in `outbound` or `accepted`, so
/// [`stop`](Transporter::stop) can shut it down even while a blocked write
/// holds the `connections` lock.
pub struct UdsTransporter {
    path: PathBuf,
    config: UdsConfig,
    inbox_tx: Sender<Bytes>,
    inbox_rx: Receiver<Bytes>,
    stop: StopSignal,
    connections: Mutex<HashMap<String, PacketWriter<Connection>>>,
    outbound: Tracked<String>,
    accepted: Arc<Tracked<u64>>,
    next_id: AtomicU64,
}

impl UdsTransporter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_config(path, UdsConfig::default())
    }

    pub fn with_config(path: impl AsRef<Path>, config: UdsConfig) -> Self {
        let (inbox_tx, inbox_rx) = crossbeam_channel::bounded(config.inbox_capacity);
        Self {
            path: path.as_ref().to_path_buf(),
            config,
            inbox_tx,
            inbox_rx,
            stop: StopSignal::new(),
            connections: Mutex::new(HashMap::new()),
            outbound: Mutex::new(HashMap::new()),
            accepted: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// The local socket path peers send to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn serve(&self, stream: Connection) -> Result<()> {
        let config = PacketConfig {
            read_timeout: None,
            ..self.config.packet.clone()
        };
        let handle = stream.try_clone()?;
        let mut reader = PacketReader::for_connection(stream, config)?;
        let inbox = self.inbox_tx.clone();
        let stop = self.stop.clone();
        let accepted = Arc::clone(&self.accepted);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.accepted).insert(id, handle);

        let spawned = std::thread::Builder::new()
            .name("tagwire-uds-reader".to_string())
            .spawn(move || {
                pump(&mut reader, &inbox, &stop);
                lock(&accepted).remove(&id);
            });
        if let Err(err) = spawned {
            lock(&self.accepted).remove(&id);
            return Err(err.into());
        }
        Ok(())
    }

    /// Record a shutdown handle for a new outbound connection.
    ///
    /// Checked under the `outbound` lock: `stop` fires the signal before
    /// draining the map, so a handle is either seen by `stop` or refused here.
    fn track_outbound(&self, destination: &str, handle: Connection) -> Result<()> {
        let mut outbound = lock(&self.outbound);
        if self.stop.is_triggered() {
            return Err(TransportError::Shutdown);
        }
        outbound.insert(destination.to_string(), handle);
        Ok(())
    }

    #[cfg(test)]
    fn accepted_len(&self) -> usize {
        lock(&self.accepted).len()
    }
}

/// Forward packets from one accepted connection until it closes or the
/// transporter stops.
fn pump(reader: &mut PacketReader<Connection>, inbox: &Sender<Bytes>, stop: &StopSignal) {
    loop {
        let payload = match reader.read_packet() {
            Ok(payload) => payload,
            Err(TransportError::ConnectionClosed) => {
                debug!("peer closed connection");
                return;
            }
            Err(err) => {
                if !stop.is_triggered() {
                    warn!(error = %err, "dropping connection after read failure");
                }
                return;
            }
        };
        select! {
            send(inbox, payload) -> res => if res.is_err() { return },
            recv(stop.receiver()) -> _ => return,
        }
    }
}

/// Wait out [`ACCEPT_BACKOFF`]; returns `true` if the stop signal fired.
fn accept_backoff(stop: &StopSignal) -> bool {
    matches!(
        stop.receiver().recv_timeout(ACCEPT_BACKOFF),
        Err(RecvTimeoutError::Disconnected)
    )
}

impl Transporter for UdsTransporter {
    fn start(&self) -> Result<()> {
        if self.stop.is_triggered() {
            return Err(TransportError::Shutdown);
        }
        let socket = UnixDomainSocket::bind_with_mode(&self.path, self.config.socket_mode)?;

        while !self.stop.is_triggered() {
            let stream = match socket.accept() {
                Ok(stream) => stream,
                Err(err) => {
                    if self.stop.is_triggered() {
                        break;
                    }
                    warn!(error = %err, "accept failed");
                    if accept_backoff(&self.stop) {
                        break;
                    }
                    continue;
                }
            };
            if self.stop.is_triggered() {
                break;
            }
            if let Err(err) = self.serve(stream) {
                warn!(error = %err, "failed to serve accepted connection");
            }
        }

        info!(path = ?self.path, "uds transporter stopped serving");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        if !self.stop.trigger() {
            return Ok(());
        }
        // Wake the accept loop; it re-checks the stop signal on every connection.
        if let Ok(waker) = UnixDomainSocket::connect(&self.path) {
            drop(waker);
        }
        // Shut down outbound sockets before taking `connections`: a send
        // blocked on a full peer holds that lock until its write fails.
        let outbound: Vec<Connection> = lock(&self.outbound).drain().map(|(_, c)| c).collect();
        for stream in outbound {
            let _ = stream.shutdown();
        }
        for (_, stream) in lock(&self.accepted).drain() {
            let _ = stream.shutdown();
        }
        lock(&self.connections).clear();
        debug!(path = ?self.path, "uds transporter stopped");
        Ok(())
    }

    fn destroy(&self) -> Result<()> {
        self.stop()
    }

    fn send(&self, destination: &str, payload: &[u8]) -> Result<()> {
        if self.stop.is_triggered() {
            return Err(TransportError::Shutdown);
        }
        let mut connections = lock(&self.connections);
        let writer = match connections.entry(destination.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let stream = UnixDomainSocket::connect(destination)?;
                let handle = stream.try_clone()?;
                let writer = PacketWriter::for_connection(stream, self.config.packet.clone())?;
                self.track_outbound(destination, handle)?;
                entry.insert(writer)
            }
        };
        if let Err(err) = writer.send(payload) {
            connections.remove(destination);
            lock(&self.outbound).remove(destination);
            return Err(err);
        }
        Ok(())
    }

    fn recv(&self) -> Result<Bytes> {
        select! {
            recv(self.inbox_rx) -> payload => payload.map_err(|_| TransportError::Shutdown),
            recv(self.stop.receiver()) -> _ => Err(TransportError::Shutdown),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
