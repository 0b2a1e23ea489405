//! Message type registry and one-byte framing.
//!
//! A [`Codec`] assigns every registered message kind a [`TypeTag`] in
//! registration order (at most [`MAX_TYPES`] kinds) and turns messages into
//! frames of the form `payload || tag`. Payload bytes come from a pluggable
//! [`Format`]; [`JsonFormat`] covers any serde type.
//!
//! Registration order is a cross-process contract: peers exchanging frames
//! must register the same kinds in the same order.

pub mod codec;
pub mod error;
pub mod format;
pub mod message;
pub mod registry;

pub use codec::{Codec, TAG_WIDTH};
pub use error::{CodecError, FormatError, Result};
pub use format::{Format, JsonFormat};
pub use message::{Message, TypeTag, MAX_TYPES};
pub use registry::Registry;
