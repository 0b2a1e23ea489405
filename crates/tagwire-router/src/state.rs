use std::fmt;

/// Lifecycle of a [`Router`](crate::Router).
///
/// Transitions only move forward: `Created → Started → Stopped → Destroyed`.
/// A router may also be stopped or destroyed without ever starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    Created,
    Started,
    Stopped,
    Destroyed,
}

impl RouterState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Destroyed => "destroyed",
        }
    }

    /// Whether the stop signal has already fired in this state.
    pub fn is_stopped(self) -> bool {
        matches!(self, Self::Stopped | Self::Destroyed)
    }
}

impl fmt::Display for RouterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
