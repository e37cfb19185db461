mod controller;
mod event;


pub use controller::{ChatController, EventEffect, Submission, TurnOutcome};
pub use event::{StreamSignal, TurnEvent};
