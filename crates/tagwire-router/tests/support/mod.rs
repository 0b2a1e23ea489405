#![allow(dead_code)]

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tagwire_codec::Message;
use tagwire_router::{Router, RouterError};

pub const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Chat {
    Ping { seq: u32 },
    Note { seq: u32, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatKind {
    Ping,
    Note,
}

impl Message for Chat {
    type Kind = ChatKind;

    fn kind(&self) -> ChatKind {
        match self {
            Chat::Ping { .. } => ChatKind::Ping,
            Chat::Note { .. } => ChatKind::Note,
        }
    }
}

pub fn ping(seq: u32) -> Chat {
    Chat::Ping { seq }
}

pub fn note(seq: u32) -> Chat {
    Chat::Note {
        seq,
        text: format!("note #{seq}"),
    }
}

/// Every endpoint registers the same kinds in this order.
pub fn register_chat(router: &mut Router<Chat>) -> Result<(), RouterError> {
    router.register_message(&ping(0))?;
    router.register_message(&note(0))?;
    Ok(())
}

pub fn temp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after the epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "tagwire-router-{tag}-{}-{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).expect("should create temp dir");
    dir
}
