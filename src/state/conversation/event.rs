use super::super::assembler::TurnId;
use crate::api::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSignal {
    /// Decoded text of one transport chunk.
    Chunk(String),
    /// The transport closed the stream normally.
    Finish,
    Failed(TransportError),
}

/// A stream signal tagged with the turn whose request produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnEvent {
    pub turn: TurnId,
    pub signal: StreamSignal,
}

impl TurnEvent {
    pub fn chunk(turn: TurnId, text: impl Into<String>) -> Self {
        Self {
            turn,
            signal: StreamSignal::Chunk(text.into()),
        }
    }

    pub fn finish(turn: TurnId) -> Self {
        Self {
            turn,
            signal: StreamSignal::Finish,
        }
    }

    pub fn failed(turn: TurnId, error: TransportError) -> Self {
        Self {
            turn,
            signal: StreamSignal::Failed(error),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.signal, StreamSignal::Chunk(_))
    }
}
