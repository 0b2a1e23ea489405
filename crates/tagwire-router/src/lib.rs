//! Threaded message router.
//!
//! A [`Router`] joins a [`Codec`](tagwire_codec::Codec) and a
//! [`Transporter`](tagwire_transport::Transporter) into a typed messaging
//! endpoint. Outbound messages are queued, encoded and handed to the
//! transporter by an egress thread; inbound frames are decoded by an ingest
//! thread and dispatched to per-kind handlers and/or a pull buffer read with
//! [`Router::recv`].
//!
//! All buffers are bounded: a slow consumer eventually blocks its producers.

pub mod config;
pub mod error;
pub mod outbox;
pub mod router;
mod stages;
pub mod state;

pub use config::{RouterConfig, DEFAULT_BUFFER_CAPACITY, DEFAULT_PREPARE_PERIOD};
pub use error::{Result, RouterError};
pub use outbox::Outbox;
pub use router::Router;
pub use stages::Handler;
pub use state::RouterState;
pub use tagwire_transport::StopSignal;
