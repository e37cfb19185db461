use super::super::assembler::{ChunkMode, TurnAssembler, TurnId};
use super::super::gate::SubmissionGate;
use super::super::history::{HistoryStore, Message};
use super::event::{StreamSignal, TurnEvent};
use crate::api::TransportError;
use crate::config::Config;
use crate::types::ChatRequest;

/// What a successful `submit` hands to the transport side.
#[derive(Debug, Clone)]
pub struct Submission {
    pub turn: TurnId,
    pub request: ChatRequest,
    pub user_message: Message,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Committed(Message),
    Failed(TransportError),
    Cancelled,
}

/// Result of feeding one stream event to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventEffect {
    /// The event belonged to no streaming turn and was dropped.
    Ignored,
    /// The in-flight display text after the chunk.
    Partial(String),
    /// The turn reached a terminal state and the lock was released.
    Finished { turn: TurnId, outcome: TurnOutcome },
}

/// Composes history, assembler and gate; the only mutator of all three.
#[derive(Debug)]
pub struct ChatController {
    history: HistoryStore,
    assembler: TurnAssembler,
    gate: SubmissionGate,
}

impl ChatController {
    pub fn new(mode: ChunkMode) -> Self {
        Self {
            history: HistoryStore::new(),
            assembler: TurnAssembler::new(mode),
            gate: SubmissionGate::new(),
        }
    }

    /// Seeds the log with `initial`; when that is empty and a greeting is
    /// given, the greeting becomes the first assistant message.
    pub fn with_history(mode: ChunkMode, initial: Vec<Message>, greeting: Option<String>) -> Self {
        let mut controller = Self::new(mode);
        let seed_greeting = initial.is_empty();
        for message in initial {
            controller.history.append(message);
        }
        if seed_greeting {
            if let Some(greeting) = greeting {
                controller.history.append(Message::assistant(greeting));
            }
        }
        controller
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_history(config.chunk_mode, Vec::new(), config.greeting.clone())
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn assembler(&self) -> &TurnAssembler {
        &self.assembler
    }

    pub fn gate(&self) -> &SubmissionGate {
        &self.gate
    }

    /// Input-field access for the view layer.
    pub fn gate_mut(&mut self) -> &mut SubmissionGate {
        &mut self.gate
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_locked()
    }

    pub fn can_submit(&self, input: &str) -> bool {
        self.gate.can_submit(input)
    }

    /// Starts a turn for `text`. A rejected submission is a silent no-op.
    pub fn submit(&mut self, text: &str) -> Option<Submission> {
        let request = self.gate.prepare(text, &self.history)?;
        let user_message = Message::user(text);
        let turn = self.assembler.begin(user_message.clone(), &mut self.history)?;
        self.gate.lock();
        tracing::info!(%turn, history_len = request.history.len(), "submitted turn");

        Some(Submission {
            turn,
            request,
            user_message,
        })
    }

    /// Submits whatever is in the pending input field.
    pub fn submit_input(&mut self) -> Option<Submission> {
        let text = self.gate.input().to_string();
        self.submit(&text)
    }

    pub fn handle(&mut self, event: TurnEvent) -> EventEffect {
        let turn = event.turn;
        match event.signal {
            StreamSignal::Chunk(text) => {
                if !self.assembler.apply_chunk(turn, &text) {
                    return EventEffect::Ignored;
                }
                let display = self
                    .assembler
                    .in_flight()
                    .map(|buffer| buffer.display().to_string())
                    .unwrap_or_default();
                EventEffect::Partial(display)
            }
            StreamSignal::Finish => match self.assembler.finish(turn, &mut self.history) {
                Some(message) => {
                    self.gate.release();
                    EventEffect::Finished {
                        turn,
                        outcome: TurnOutcome::Committed(message),
                    }
                }
                None => EventEffect::Ignored,
            },
            StreamSignal::Failed(error) => {
                if !self.assembler.fail(turn, error.clone()) {
                    return EventEffect::Ignored;
                }
                self.gate.release();
                EventEffect::Finished {
                    turn,
                    outcome: TurnOutcome::Failed(error),
                }
            }
        }
    }

    /// Tears down the streaming turn, if any; nothing is committed for it.
    pub fn cancel(&mut self) -> EventEffect {
        let Some(turn) = self.assembler.cancel() else {
            return EventEffect::Ignored;
        };
        self.gate.release();
        EventEffect::Finished {
            turn,
            outcome: TurnOutcome::Cancelled,
        }
    }
}
