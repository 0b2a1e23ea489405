use bytes::{BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::FormatError;
use crate::message::Message;

/// Payload serialization plugged into a [`Codec`](crate::Codec).
///
/// The codec owns tagging; a format only turns one message into payload
/// bytes and back. `decode` receives the kind named by the frame's tag so
/// formats that do not embed a discriminant can pick the variant.
pub trait Format<M: Message>: Send + Sync + 'static {
    /// Append the payload for `msg` to `dst`.
    fn encode(&self, msg: &M, dst: &mut BytesMut) -> Result<(), FormatError>;

    /// Decode a payload known to hold a message of `kind`.
    fn decode(&self, kind: M::Kind, payload: &[u8]) -> Result<M, FormatError>;
}

/// JSON payloads through serde_json.
///
/// The whole message value is encoded, so serde's own enum representation
/// carries the variant; `decode` checks it against the tagged kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl<M> Format<M> for JsonFormat
where
    M: Message + Serialize + DeserializeOwned,
{
    fn encode(&self, msg: &M, dst: &mut BytesMut) -> Result<(), FormatError> {
        serde_json::to_writer(dst.writer(), msg)?;
        Ok(())
    }

    fn decode(&self, kind: M::Kind, payload: &[u8]) -> Result<M, FormatError> {
        let msg: M = serde_json::from_slice(payload)?;
        if msg.kind() != kind {
            return Err(FormatError::KindMismatch {
                expected: format!("{kind:?}"),
                actual: format!("{:?}", msg.kind()),
            });
        }
        Ok(msg)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Shape {
        Circle { r: u32 },
        Square(u32),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum ShapeKind {
        Circle,
        Square,
    }

    impl Message for Shape {
        type Kind = ShapeKind;

        fn kind(&self) -> ShapeKind {
            match self {
                Shape::Circle { .. } => ShapeKind::Circle,
                Shape::Square(_) => ShapeKind::Square,
            }
        }
    }

    #[test]
    fn json_encodes_whole_value() {
        let mut buf = BytesMut::new();
        JsonFormat.encode(&Shape::Square(4), &mut buf).unwrap();
        assert_eq!(buf.as_ref(), br#"{"Square":4}"#);

        let decoded: Shape = JsonFormat.decode(ShapeKind::Square, &buf).unwrap();
        assert_eq!(decoded, Shape::Square(4));
    }

    #[test]
    fn json_rejects_kind_mismatch() {
        let mut buf = BytesMut::new();
        JsonFormat
            .encode(&Shape::Circle { r: 2 }, &mut buf)
            .unwrap();

        let result: Result<Shape, _> = JsonFormat.decode(ShapeKind::Square, &buf);
        assert!(matches!(result, Err(FormatError::KindMismatch { .. })));
    }

    #[test]
    fn json_surfaces_parse_errors() {
        let result: Result<Shape, _> = JsonFormat.decode(ShapeKind::Circle, b"{not json");
        assert!(matches!(result, Err(FormatError::Json(_))));
    }
}
