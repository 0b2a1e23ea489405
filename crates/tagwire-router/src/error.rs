use std::time::Duration;

use crate::state::RouterState;

/// Errors that can occur in router operations.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Neither handler nor pull delivery is enabled.
    #[error("router needs handler or pull delivery enabled")]
    NoDeliveryMode,

    /// A capacity or period in the config is unusable.
    #[error("invalid router config: {0}")]
    InvalidConfig(String),

    /// The kind already has a registration or a handler on this router.
    #[error("message kind {kind} is already registered")]
    AlreadyRegistered { kind: String },

    /// `register_handler` on a router built without handler delivery.
    #[error("handler delivery is disabled")]
    HandlerDisabled,

    /// `recv` on a router built without pull delivery.
    #[error("pull delivery is disabled")]
    RecvDisabled,

    /// `send` with a kind the router never registered.
    #[error("message kind {kind} is not registered")]
    UnregisteredType { kind: String },

    /// The operation is not allowed in the router's current state.
    #[error("cannot {operation} a {state} router")]
    InvalidState {
        operation: &'static str,
        state: RouterState,
    },

    /// The router was stopped.
    #[error("router stopped")]
    Stopped,

    /// The delivery buffer is closed and drained.
    #[error("delivery buffer closed")]
    Closed,

    /// No message arrived in time.
    #[error("no message within {0:?}")]
    Timeout(Duration),

    /// The transporter's start thread died without reporting a result.
    #[error("transporter start aborted")]
    StartAborted,

    /// A pipeline thread could not be spawned.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Codec-level error.
    #[error("codec error: {0}")]
    Codec(#[from] tagwire_codec::CodecError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] tagwire_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, RouterError>;
