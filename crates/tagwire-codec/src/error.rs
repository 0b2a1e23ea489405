use crate::message::MAX_TYPES;

/// Errors raised by a [`Format`](crate::Format) while encoding or decoding.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// serde_json rejected the value or the bytes.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload decoded to a different kind than its tag names.
    #[error("decoded kind {actual} but the tag names {expected}")]
    KindMismatch { expected: String, actual: String },

    /// Any other format-specific failure.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Errors raised by [`Codec`](crate::Codec) operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The kind already holds a tag in this codec.
    #[error("message kind {kind} is already registered")]
    AlreadyRegistered { kind: String },

    /// The format cannot encode a sample of this kind.
    #[error("message kind {kind} is not supported by the format: {source}")]
    UnsupportedType {
        kind: String,
        #[source]
        source: FormatError,
    },

    /// Every one-byte tag is taken.
    #[error("tag space exhausted ({MAX_TYPES} kinds already registered)")]
    TagSpaceExhausted,

    /// `marshal` was given a kind this codec never registered.
    #[error("unknown message kind {kind}")]
    UnknownType { kind: String },

    /// Encoding a registered kind failed.
    #[error("failed to encode message kind {kind}: {source}")]
    EncodeFailed {
        kind: String,
        #[source]
        source: FormatError,
    },

    /// The frame is too short to carry a tag.
    #[error("malformed frame ({len} bytes, need at least 1)")]
    MalformedFrame { len: usize },

    /// No kind is registered under the frame's tag.
    #[error("unknown tag {0}")]
    UnknownTag(u8),

    /// The payload could not be decoded as the tagged kind.
    #[error("failed to decode payload with tag {tag}: {source}")]
    DecodeFailed {
        tag: u8,
        #[source]
        source: FormatError,
    },

    /// `marshal`/`unmarshal` called before `initialize`.
    #[error("codec not initialized")]
    NotInitialized,

    /// The codec has been destroyed.
    #[error("codec destroyed")]
    Destroyed,
}

pub type Result<T> = std::result::Result<T, CodecError>;
