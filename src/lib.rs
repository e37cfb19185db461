//! Streaming chat controller for the course assistant.
//!
//! A [`state::ChatController`] owns the append-only history, the turn
//! assembler and the submission gate; a [`runtime::ChatRuntime`] feeds it
//! events from a [`api::CompletionService`] stream one at a time.

pub mod api;
pub mod config;
pub mod logging;
pub mod runtime;
pub mod session;
pub mod state;
pub mod terminal;
pub mod types;
pub mod ui;
pub mod util;

#[cfg(test)]
mod test_support;
