//! Typed message routing over pluggable byte transports.
//!
//! tagwire lets two endpoints exchange strongly typed messages over any
//! transport that moves opaque byte payloads. Each message kind gets a
//! one-byte tag in registration order; frames travel as `payload || tag`.
//!
//! # Crate Structure
//!
//! - [`transport`]: the `Transporter` contract plus in-memory and Unix domain
//!   socket implementations
//! - [`codec`]: kind registration, tagging and payload formats
//! - [`router`]: the threaded router with handler and pull delivery
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use serde::{Deserialize, Serialize};
//! use tagwire::codec::{Codec, Message};
//! use tagwire::router::Router;
//! use tagwire::transport::MemoryNetwork;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! enum Event {
//!     Hello(String),
//! }
//!
//! impl Message for Event {
//!     type Kind = ();
//!
//!     fn kind(&self) -> Self::Kind {}
//! }
//!
//! let network = MemoryNetwork::new();
//! let mut router: Router<Event> =
//!     Router::new(Codec::json(), Arc::new(network.bind("me")), true, false)?;
//! router.register_message(&Event::Hello(String::new()))?;
//! router.start()?;
//! router.send("me", Event::Hello("world".into()))?;
//! let Event::Hello(name) = router.recv()?;
//! println!("hello {name}");
//! # Ok::<(), tagwire::router::RouterError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use tagwire_transport::*;
}

/// Re-export codec types.
pub mod codec {
    pub use tagwire_codec::*;
}

/// Re-export router types.
pub mod router {
    pub use tagwire_router::*;
}
