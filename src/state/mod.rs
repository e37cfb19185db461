pub mod assembler;
pub mod conversation;
pub mod gate;
pub mod history;
pub mod normalize;

pub use assembler::{ChunkMode, InFlightBuffer, TurnAssembler, TurnId, TurnState};
pub use conversation::{
    ChatController, EventEffect, StreamSignal, Submission, TurnEvent, TurnOutcome,
};
pub use gate::SubmissionGate;
pub use history::{HistoryStore, Message};
pub use normalize::normalize;
