use std::fmt;
use std::hash::Hash;

/// Maximum number of message kinds one codec can register.
pub const MAX_TYPES: usize = 256;

/// A closed set of message variants exchanged through a codec.
///
/// Implement this for the enum holding every message shape a process sends
/// or receives. [`kind`](Message::kind) names the variant of a value; the
/// codec maps kinds to one-byte tags in registration order.
///
/// ```
/// use tagwire_codec::Message;
///
/// enum Chat {
///     Ping { seq: u64 },
///     Note(String),
/// }
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum ChatKind {
///     Ping,
///     Note,
/// }
///
/// impl Message for Chat {
///     type Kind = ChatKind;
///
///     fn kind(&self) -> ChatKind {
///         match self {
///             Chat::Ping { .. } => ChatKind::Ping,
///             Chat::Note(_) => ChatKind::Note,
///         }
///     }
/// }
/// ```
pub trait Message: Send + 'static {
    /// Discriminant identifying one variant.
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

/// One-byte wire identifier assigned to a kind at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(u8);

impl TypeTag {
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl From<u8> for TypeTag {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
