pub mod api;

pub use api::{ChatRequest, HistoryEntry, Role};
