use bytes::Bytes;

use crate::error::Result;

/// Byte-level send/receive primitive keyed by peer address.
///
/// The router drives a transporter from several threads at once: one thread
/// serves [`start`](Transporter::start), the ingest stage sits in
/// [`recv`](Transporter::recv), and the egress stage calls
/// [`send`](Transporter::send). Implementations must therefore be
/// `Send + Sync` and object safe so they can be shared as
/// `Arc<dyn Transporter>`.
pub trait Transporter: Send + Sync + 'static {
    /// Start serving. May block for as long as the transporter runs.
    ///
    /// Errors raised while preparing (binding, claiming the address) must be
    /// returned promptly; the router treats an error within its start-up
    /// window as fatal.
    fn start(&self) -> Result<()>;

    /// Stop serving. Must unblock any thread parked in [`recv`](Transporter::recv)
    /// with [`TransportError::Shutdown`](crate::TransportError::Shutdown).
    fn stop(&self) -> Result<()>;

    /// Release all resources. Called after `stop`; must tolerate repeats.
    fn destroy(&self) -> Result<()>;

    /// Deliver one payload to `destination`. Best effort, no retry.
    fn send(&self, destination: &str, payload: &[u8]) -> Result<()>;

    /// Block until one inbound payload is available.
    fn recv(&self) -> Result<Bytes>;
}
