//! Byte-level transport for tagwire routers.
//!
//! The router only needs the [`Transporter`] contract: send opaque bytes to
//! an address, block for inbound bytes, and a start/stop/destroy lifecycle.
//! Two implementations ship here:
//! - [`MemoryTransporter`]: in-process delivery through a [`MemoryNetwork`]
//! - [`UdsTransporter`]: Unix domain sockets, one length-prefixed packet
//!   per payload (Unix only)
//!
//! [`StopSignal`] is the one-shot broadcast both transporters and the router
//! use to wind down blocked loops.

pub mod error;
pub mod memory;
pub mod packet;
pub mod signal;
pub mod stream;
pub mod transporter;

#[cfg(unix)]
pub mod connection;
#[cfg(unix)]
pub mod uds;
#[cfg(unix)]
pub mod uds_transporter;

pub use error::{Result, TransportError};
pub use memory::{MemoryConfig, MemoryNetwork, MemoryTransporter};
pub use packet::{decode_packet, encode_packet, PacketConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use signal::StopSignal;
pub use stream::{PacketReader, PacketWriter};
pub use transporter::Transporter;

#[cfg(unix)]
pub use connection::Connection;
#[cfg(unix)]
pub use uds::UnixDomainSocket;
#[cfg(unix)]
pub use uds_transporter::{UdsConfig, UdsTransporter};
