use crate::api::TransportError;
use crate::state::{Message, TurnId};

/// Notifications for whoever embeds the runtime (view layer, host callbacks).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiUpdate {
    /// A message entered the history: the optimistic user turn or a commit.
    MessageAdded(Message),
    /// Fresh normalized partial text for the streaming turn.
    StreamDelta { turn: TurnId, display: String },
    TurnComplete { turn: TurnId },
    TurnCancelled { turn: TurnId },
    Error { turn: TurnId, error: TransportError },
}
