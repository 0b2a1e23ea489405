use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, Ordering};

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::{CodecError, FormatError, Result};
use crate::format::{Format, JsonFormat};
use crate::message::{Message, TypeTag};
use crate::registry::Registry;

/// Width of the trailing tag in every frame.
pub const TAG_WIDTH: usize = 1;

const CREATED: u8 = 0;
const READY: u8 = 1;
const DESTROYED: u8 = 2;

/// Maps message kinds to one-byte tags and frames messages with them.
///
/// Frame layout: `payload || tag`, the format's payload bytes followed by
/// exactly one trailing tag byte.
///
/// Tags follow registration order, so two processes only understand each
/// other's frames when both register the same kinds in the same order.
/// Registration takes `&mut self`; once a codec is shared for concurrent
/// `marshal`/`unmarshal` its registry is fixed.
pub struct Codec<M: Message, F = JsonFormat> {
    format: F,
    registry: Registry<M::Kind>,
    state: AtomicU8,
    _message: PhantomData<fn() -> M>,
}

impl<M> Codec<M, JsonFormat>
where
    M: Message,
    JsonFormat: Format<M>,
{
    /// Codec with JSON payloads.
    pub fn json() -> Self {
        Self::new(JsonFormat)
    }
}

impl<M: Message, F: Format<M>> Codec<M, F> {
    pub fn new(format: F) -> Self {
        Self {
            format,
            registry: Registry::new(),
            state: AtomicU8::new(CREATED),
            _message: PhantomData,
        }
    }

    /// Register the kind of `sample` under the next free tag.
    ///
    /// The sample is encoded once to prove the format supports it. A failed
    /// registration does not consume a tag.
    pub fn register_message(&mut self, sample: &M) -> Result<TypeTag> {
        if self.state.load(Ordering::Acquire) == DESTROYED {
            return Err(CodecError::Destroyed);
        }

        let kind = sample.kind();
        if self.registry.contains(&kind) {
            return Err(CodecError::AlreadyRegistered {
                kind: format!("{kind:?}"),
            });
        }
        if self.registry.next_tag().is_none() {
            return Err(CodecError::TagSpaceExhausted);
        }

        let mut probe = BytesMut::new();
        self.format
            .encode(sample, &mut probe)
            .map_err(|source| CodecError::UnsupportedType {
                kind: format!("{kind:?}"),
                source,
            })?;

        let tag = self.registry.insert(kind);
        debug!(?kind, %tag, "registered message kind");
        Ok(tag)
    }

    /// Encode `msg` into a frame.
    pub fn marshal(&self, msg: &M) -> Result<Bytes> {
        self.ensure_ready()?;

        let kind = msg.kind();
        let tag = self
            .registry
            .tag_of(&kind)
            .ok_or_else(|| CodecError::UnknownType {
                kind: format!("{kind:?}"),
            })?;

        let mut frame = BytesMut::new();
        self.format
            .encode(msg, &mut frame)
            .map_err(|source| CodecError::EncodeFailed {
                kind: format!("{kind:?}"),
                source,
            })?;
        frame.put_u8(tag.get());
        Ok(frame.freeze())
    }

    /// Decode a frame produced by a codec with the same registration order.
    pub fn unmarshal(&self, frame: &[u8]) -> Result<M> {
        self.ensure_ready()?;

        let Some((&tag, payload)) = frame.split_last() else {
            return Err(CodecError::MalformedFrame { len: frame.len() });
        };
        let kind = self
            .registry
            .kind_of(TypeTag::new(tag))
            .ok_or(CodecError::UnknownTag(tag))?;

        let msg = self
            .format
            .decode(kind, payload)
            .map_err(|source| CodecError::DecodeFailed { tag, source })?;
        if msg.kind() != kind {
            return Err(CodecError::DecodeFailed {
                tag,
                source: FormatError::KindMismatch {
                    expected: format!("{kind:?}"),
                    actual: format!("{:?}", msg.kind()),
                },
            });
        }
        Ok(msg)
    }
}

impl<M: Message, F> Codec<M, F> {
    /// Prepare the codec for `marshal`/`unmarshal`. No-op when already ready.
    pub fn initialize(&self) -> Result<()> {
        match self
            .state
            .compare_exchange(CREATED, READY, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                debug!(kinds = self.registry.len(), "codec initialized");
                Ok(())
            }
            Err(READY) => Ok(()),
            Err(_) => Err(CodecError::Destroyed),
        }
    }

    /// Release the codec. Idempotent; later `marshal`/`unmarshal` fail.
    pub fn destroy(&self) -> Result<()> {
        if self.state.swap(DESTROYED, Ordering::AcqRel) != DESTROYED {
            debug!("codec destroyed");
        }
        Ok(())
    }

    pub fn tag_of(&self, kind: M::Kind) -> Option<TypeTag> {
        self.registry.tag_of(&kind)
    }

    pub fn kind_of(&self, tag: TypeTag) -> Option<M::Kind> {
        self.registry.kind_of(tag)
    }

    pub fn is_registered(&self, kind: M::Kind) -> bool {
        self.registry.contains(&kind)
    }

    /// Registered kinds in tag order.
    pub fn kinds(&self) -> &[M::Kind] {
        self.registry.kinds()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn format(&self) -> &F {
        &self.format
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state.load(Ordering::Acquire) {
            READY => Ok(()),
            CREATED => Err(CodecError::NotInitialized),
            _ => Err(CodecError::Destroyed),
        }
    }
}

impl<M: Message, F> std::fmt::Debug for Codec<M, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("kinds", &self.registry.kinds())
            .field("state", &self.state.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::message::MAX_TYPES;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum Event {
        Started { id: u32, name: String },
        Progress(f32),
        Finished,
        Indexed(BTreeMap<(u8, u8), u8>),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum EventKind {
        Started,
        Progress,
        Finished,
        Indexed,
    }

    impl Message for Event {
        type Kind = EventKind;

        fn kind(&self) -> EventKind {
            match self {
                Event::Started { .. } => EventKind::Started,
                Event::Progress(_) => EventKind::Progress,
                Event::Finished => EventKind::Finished,
                Event::Indexed(_) => EventKind::Indexed,
            }
        }
    }

    fn started() -> Event {
        Event::Started {
            id: 7,
            name: "build".to_string(),
        }
    }

    fn indexed() -> Event {
        Event::Indexed(BTreeMap::from([((1, 2), 3)]))
    }

    fn ready_codec() -> Codec<Event> {
        let mut codec = Codec::json();
        codec.register_message(&started()).unwrap();
        codec.register_message(&Event::Progress(0.0)).unwrap();
        codec.register_message(&Event::Finished).unwrap();
        codec.initialize().unwrap();
        codec
    }

    #[test]
    fn roundtrip_every_registered_kind() {
        let codec = ready_codec();
        for msg in [started(), Event::Progress(0.5), Event::Finished] {
            let frame = codec.marshal(&msg).unwrap();
            assert_eq!(codec.unmarshal(&frame).unwrap(), msg);
        }
    }

    #[test]
    fn frame_is_payload_then_trailing_tag() {
        let codec = ready_codec();
        let frame = codec.marshal(&Event::Progress(0.25)).unwrap();

        let (tag, payload) = frame.split_last().unwrap();
        assert_eq!(*tag, 1);
        assert_eq!(payload, br#"{"Progress":0.25}"#);
    }

    #[test]
    fn tags_follow_registration_order() {
        let codec = ready_codec();
        assert_eq!(codec.tag_of(EventKind::Started), Some(TypeTag::new(0)));
        assert_eq!(codec.tag_of(EventKind::Progress), Some(TypeTag::new(1)));
        assert_eq!(codec.tag_of(EventKind::Finished), Some(TypeTag::new(2)));
        assert_eq!(codec.kind_of(TypeTag::new(2)), Some(EventKind::Finished));
        assert_eq!(
            codec.kinds(),
            &[EventKind::Started, EventKind::Progress, EventKind::Finished]
        );
    }

    #[test]
    fn duplicate_registration_keeps_first_tag() {
        let mut codec: Codec<Event> = Codec::json();
        let first = codec.register_message(&Event::Finished).unwrap();

        let err = codec.register_message(&Event::Finished).unwrap_err();
        assert!(matches!(err, CodecError::AlreadyRegistered { .. }));
        assert_eq!(codec.tag_of(EventKind::Finished), Some(first));
        assert_eq!(codec.len(), 1);
    }

    #[test]
    fn unsupported_sample_does_not_consume_a_tag() {
        let mut codec: Codec<Event> = Codec::json();
        codec.register_message(&Event::Finished).unwrap();

        let err = codec.register_message(&indexed()).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedType { .. }));
        assert!(!codec.is_registered(EventKind::Indexed));

        let tag = codec.register_message(&Event::Progress(1.0)).unwrap();
        assert_eq!(tag, TypeTag::new(1));
    }

    #[test]
    fn marshal_rejects_unregistered_kind() {
        let codec = ready_codec();
        let err = codec.marshal(&indexed()).unwrap_err();
        assert!(matches!(err, CodecError::UnknownType { .. }));
    }

    #[test]
    fn frames_do_not_cross_codecs_with_other_registrations() {
        let codec = ready_codec();
        let mut other: Codec<Event> = Codec::json();
        other.register_message(&Event::Finished).unwrap();
        other.initialize().unwrap();

        assert!(matches!(
            other.marshal(&started()),
            Err(CodecError::UnknownType { .. })
        ));

        // Tag 0 means `Started` here but `Finished` in `other`.
        let frame = codec.marshal(&started()).unwrap();
        assert!(matches!(
            other.unmarshal(&frame),
            Err(CodecError::DecodeFailed { tag: 0, .. })
        ));
    }

    #[test]
    fn unmarshal_rejects_empty_frame() {
        let codec = ready_codec();
        assert!(matches!(
            codec.unmarshal(&[]),
            Err(CodecError::MalformedFrame { len: 0 })
        ));
    }

    #[test]
    fn unmarshal_rejects_unassigned_tag() {
        let codec = ready_codec();
        let mut frame = br#""Finished""#.to_vec();
        frame.push(42);
        assert!(matches!(
            codec.unmarshal(&frame),
            Err(CodecError::UnknownTag(42))
        ));
    }

    #[test]
    fn unmarshal_surfaces_decode_failure() {
        let codec = ready_codec();
        let frame = [b'{', b'x', 0];
        assert!(matches!(
            codec.unmarshal(&frame),
            Err(CodecError::DecodeFailed { tag: 0, .. })
        ));
    }

    #[test]
    fn must_initialize_before_use() {
        let mut codec: Codec<Event> = Codec::json();
        codec.register_message(&Event::Finished).unwrap();

        assert!(matches!(
            codec.marshal(&Event::Finished),
            Err(CodecError::NotInitialized)
        ));
        codec.initialize().unwrap();
        codec.initialize().unwrap();
        assert!(codec.marshal(&Event::Finished).is_ok());
    }

    #[test]
    fn destroy_is_idempotent_and_final() {
        let codec = ready_codec();
        codec.destroy().unwrap();
        codec.destroy().unwrap();

        assert!(matches!(codec.initialize(), Err(CodecError::Destroyed)));
        assert!(matches!(
            codec.marshal(&Event::Finished),
            Err(CodecError::Destroyed)
        ));
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Numbered {
        id: u16,
    }

    impl Message for Numbered {
        type Kind = u16;

        fn kind(&self) -> u16 {
            self.id
        }
    }

    #[test]
    fn tag_space_holds_exactly_256_kinds() {
        let mut codec: Codec<Numbered> = Codec::json();
        for id in 0..MAX_TYPES as u16 {
            codec.register_message(&Numbered { id }).unwrap();
        }
        assert_eq!(codec.tag_of(255), Some(TypeTag::new(255)));

        let err = codec.register_message(&Numbered { id: 256 }).unwrap_err();
        assert!(matches!(err, CodecError::TagSpaceExhausted));
        assert_eq!(codec.len(), MAX_TYPES);
    }
}
