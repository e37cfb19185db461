use super::history::{HistoryStore, Message};
use super::normalize::normalize;
use crate::api::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How successive transport chunks relate to each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkMode {
    /// Each chunk is new text to append (raw HTTP body streaming).
    #[default]
    Delta,
    /// Each chunk is the whole response so far and replaces the buffer.
    Cumulative,
}

impl ChunkMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "delta" | "incremental" => Some(Self::Delta),
            "cumulative" | "total" | "running_total" => Some(Self::Cumulative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TurnId(u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

/// Where the assembler rests between events.
///
/// `Failed` and `Cancelled` behave like `Idle` for `begin`; they only record
/// how the previous turn ended. The commit itself happens entirely inside
/// `finish`, which lands back in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Streaming,
    Cancelled,
    Failed,
}

/// Partial response of the turn currently streaming.
#[derive(Debug, Clone)]
pub struct InFlightBuffer {
    turn: TurnId,
    raw: String,
    display: String,
    chunks: usize,
}

impl InFlightBuffer {
    fn new(turn: TurnId) -> Self {
        Self {
            turn,
            raw: String::new(),
            display: String::new(),
            chunks: 0,
        }
    }

    pub fn turn(&self) -> TurnId {
        self.turn
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn chunks(&self) -> usize {
        self.chunks
    }
}

/// Owns the in-flight buffer and is the only writer of assistant messages.
///
/// Every stream-side call names the turn it belongs to; calls for any turn
/// other than the one currently streaming are ignored and return `false` or
/// `None`.
#[derive(Debug)]
pub struct TurnAssembler {
    mode: ChunkMode,
    state: TurnState,
    in_flight: Option<InFlightBuffer>,
    last_error: Option<TransportError>,
    next_turn: u64,
}

impl TurnAssembler {
    pub fn new(mode: ChunkMode) -> Self {
        Self {
            mode,
            state: TurnState::Idle,
            in_flight: None,
            last_error: None,
            next_turn: 1,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == TurnState::Streaming
    }

    pub fn in_flight(&self) -> Option<&InFlightBuffer> {
        self.in_flight.as_ref()
    }

    /// Error of the most recent failed turn; `None` unless resting in `Failed`.
    pub fn last_error(&self) -> Option<&TransportError> {
        match self.state {
            TurnState::Failed => self.last_error.as_ref(),
            _ => None,
        }
    }

    /// Optimistically appends the user message and opens a new buffer.
    pub fn begin(&mut self, user: Message, history: &mut HistoryStore) -> Option<TurnId> {
        if self.state == TurnState::Streaming {
            tracing::warn!(state = ?self.state, "begin while a turn is active");
            return None;
        }

        let turn = TurnId(self.next_turn);
        self.next_turn += 1;
        history.append(user);
        self.in_flight = Some(InFlightBuffer::new(turn));
        self.last_error = None;
        self.state = TurnState::Streaming;
        tracing::debug!(%turn, "turn streaming");
        Some(turn)
    }

    pub fn apply_chunk(&mut self, turn: TurnId, chunk: &str) -> bool {
        let mode = self.mode;
        let Some(buffer) = self.streaming_buffer_mut(turn) else {
            tracing::trace!(%turn, "dropping chunk for inactive turn");
            return false;
        };

        match mode {
            ChunkMode::Delta => buffer.raw.push_str(chunk),
            ChunkMode::Cumulative => {
                buffer.raw.clear();
                buffer.raw.push_str(chunk);
            }
        }
        buffer.chunks += 1;
        buffer.display = normalize(&buffer.raw);
        true
    }

    /// The single commit point: appends exactly one assistant message.
    pub fn finish(&mut self, turn: TurnId, history: &mut HistoryStore) -> Option<Message> {
        self.streaming_buffer_mut(turn)?;
        let buffer = self.in_flight.take()?;

        let message = Message::assistant(normalize(&buffer.raw));
        history.append(message.clone());
        tracing::debug!(
            %turn,
            chunks = buffer.chunks,
            chars = message.content.len(),
            "turn committed"
        );
        self.state = TurnState::Idle;
        Some(message)
    }

    pub fn fail(&mut self, turn: TurnId, error: TransportError) -> bool {
        if self.streaming_buffer_mut(turn).is_none() {
            tracing::trace!(%turn, %error, "dropping error for inactive turn");
            return false;
        }

        self.in_flight = None;
        tracing::warn!(%turn, %error, "turn failed");
        self.last_error = Some(error);
        self.state = TurnState::Failed;
        true
    }

    /// Abandons the streaming turn without committing anything.
    pub fn cancel(&mut self) -> Option<TurnId> {
        if self.state != TurnState::Streaming {
            return None;
        }

        let turn = self.in_flight.take().map(|buffer| buffer.turn);
        tracing::debug!(turn = ?turn, "turn cancelled");
        self.state = TurnState::Cancelled;
        turn
    }

    fn streaming_buffer_mut(&mut self, turn: TurnId) -> Option<&mut InFlightBuffer> {
        if self.state != TurnState::Streaming {
            return None;
        }
        self.in_flight
            .as_mut()
            .filter(|buffer| buffer.turn == turn)
    }
}
