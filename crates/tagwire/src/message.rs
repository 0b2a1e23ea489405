use serde::{Deserialize, Serialize};
use tagwire_codec::Message;
use tagwire_router::{Router, RouterError};

/// Messages exchanged between `tagwire` CLI processes.
///
/// `reply_to` carries the sender's socket path so an echo can answer without
/// being told where to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CliMessage {
    Text {
        text: String,
        reply_to: Option<String>,
    },
    Ping {
        seq: u64,
        reply_to: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CliKind {
    Text,
    Ping,
}

impl CliKind {
    pub const ALL: [CliKind; 2] = [CliKind::Text, CliKind::Ping];

    pub fn as_str(self) -> &'static str {
        match self {
            CliKind::Text => "text",
            CliKind::Ping => "ping",
        }
    }
}

impl Message for CliMessage {
    type Kind = CliKind;

    fn kind(&self) -> CliKind {
        match self {
            CliMessage::Text { .. } => CliKind::Text,
            CliMessage::Ping { .. } => CliKind::Ping,
        }
    }
}

impl CliMessage {
    pub fn reply_to(&self) -> Option<&str> {
        match self {
            CliMessage::Text { reply_to, .. } | CliMessage::Ping { reply_to, .. } => {
                reply_to.as_deref()
            }
        }
    }
}

/// Register the CLI message set. Every subcommand goes through here so all
/// processes agree on the wire tags.
pub fn register(router: &mut Router<CliMessage>) -> Result<(), RouterError> {
    router.register_message(&CliMessage::Text {
        text: String::new(),
        reply_to: None,
    })?;
    router.register_message(&CliMessage::Ping {
        seq: 0,
        reply_to: None,
    })?;
    Ok(())
}
