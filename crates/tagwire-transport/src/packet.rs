//! Length-prefixed packets carried over a byte stream.
//!
//! The stream transporter needs message boundaries that a socket does not
//! provide. Every payload handed to [`Transporter::send`](crate::Transporter::send)
//! travels as one packet:
//!
//! ```text
//! ┌──────────────┬───────────┬─────────────────┐
//! │ Magic (2B)   │ Length    │ Payload          │
//! │ 0x54 0x57    │ (4B LE)   │ (Length bytes)   │
//! │ "TW"         │           │                  │
//! └──────────────┴───────────┴─────────────────┘
//! ```

use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, TransportError};

/// Packet header: magic (2) + length (4).
pub const HEADER_SIZE: usize = 6;

/// Magic bytes: "TW".
pub const MAGIC: [u8; 2] = [0x54, 0x57];

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Append one packet carrying `payload` to `dst`.
pub fn encode_packet(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(TransportError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Split one complete packet off the front of `src`.
///
/// Returns `Ok(None)` while the buffer holds less than a full packet.
pub fn decode_packet(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }
    if src[0..2] != MAGIC {
        return Err(TransportError::InvalidMagic);
    }

    let payload_len = u32::from_le_bytes([src[2], src[3], src[4], src[5]]) as usize;
    if payload_len > max_payload {
        return Err(TransportError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }
    if src.len() < HEADER_SIZE + payload_len {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    Ok(Some(src.split_to(payload_len).freeze()))
}

/// Limits applied by [`PacketReader`](crate::PacketReader) and
/// [`PacketWriter`](crate::PacketWriter).
#[derive(Debug, Clone)]
pub struct PacketConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Read timeout applied to IPC streams.
    pub read_timeout: Option<Duration>,
    /// Write timeout applied to IPC streams.
    pub write_timeout: Option<Duration>,
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode() {
        let mut buf = BytesMut::new();
        encode_packet(b"frame-bytes", &mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE + 11);

        let payload = decode_packet(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(payload.as_ref(), b"frame-bytes");
        assert!(buf.is_empty());
    }

    #[test]
    fn incomplete_header_waits() {
        let mut buf = BytesMut::from(&[0x54, 0x57, 0x01][..]);
        assert!(decode_packet(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
        assert_eq!(buf.len(), 3, "partial header must stay buffered");
    }

    #[test]
    fn incomplete_payload_waits() {
        let mut buf = BytesMut::new();
        encode_packet(b"hello", &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2);
        assert!(decode_packet(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = BytesMut::from(&[0xFF, 0xFF, 0, 0, 0, 0][..]);
        let result = decode_packet(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(TransportError::InvalidMagic)));
    }

    #[test]
    fn rejects_oversized_length() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u32_le(64);

        let result = decode_packet(&mut buf, 16);
        assert!(matches!(
            result,
            Err(TransportError::PayloadTooLarge { size: 64, max: 16 })
        ));
    }

    #[test]
    fn back_to_back_packets() {
        let mut buf = BytesMut::new();
        encode_packet(b"first", &mut buf).unwrap();
        encode_packet(b"", &mut buf).unwrap();
        encode_packet(b"third", &mut buf).unwrap();

        let first = decode_packet(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        let empty = decode_packet(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        let third = decode_packet(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();

        assert_eq!(first.as_ref(), b"first");
        assert!(empty.is_empty());
        assert_eq!(third.as_ref(), b"third");
        assert!(buf.is_empty());
    }
}
