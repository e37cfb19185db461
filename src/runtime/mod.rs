pub mod event;
pub mod r#loop;
mod stream_task;

pub use event::UiUpdate;
pub use r#loop::ChatRuntime;
