pub mod layout;
pub mod render;
pub mod transcript;

pub use transcript::{present, RowBody, ScrollFollower, Transcript, TranscriptRow};
