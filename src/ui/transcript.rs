use crate::state::{HistoryStore, Message, TurnAssembler};
use crate::types::Role;
use chrono::{DateTime, Local};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowBody {
    Text(String),
    /// Streaming has started but no visible text has arrived yet.
    Loading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRow {
    pub role: Role,
    pub body: RowBody,
    /// `HH:MM` for committed messages; the pending row has none.
    pub time: Option<String>,
    pub pending: bool,
}

impl TranscriptRow {
    fn committed(message: &Message) -> Self {
        Self {
            role: message.role,
            body: RowBody::Text(message.content.clone()),
            time: Some(format_time(&message.timestamp)),
            pending: false,
        }
    }
}

/// Render-ready projection of the conversation. Never written back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcript {
    pub rows: Vec<TranscriptRow>,
    pub error: Option<String>,
}

impl Transcript {
    pub fn pending_text(&self) -> Option<&str> {
        self.rows
            .last()
            .filter(|row| row.pending)
            .map(|row| match &row.body {
                RowBody::Text(text) => text.as_str(),
                RowBody::Loading => "",
            })
    }
}

pub fn present(history: &HistoryStore, assembler: &TurnAssembler) -> Transcript {
    let mut rows: Vec<TranscriptRow> = history
        .as_slice()
        .iter()
        .map(TranscriptRow::committed)
        .collect();

    if assembler.is_streaming() {
        let display = assembler
            .in_flight()
            .map(|buffer| buffer.display())
            .unwrap_or_default();
        let body = if display.is_empty() {
            RowBody::Loading
        } else {
            RowBody::Text(display.to_string())
        };
        rows.push(TranscriptRow {
            role: Role::Assistant,
            body,
            time: None,
            pending: true,
        });
    }

    let error = assembler
        .last_error()
        .map(|error| format!("Error: {error}"));

    Transcript { rows, error }
}

pub fn format_time(timestamp: &DateTime<Local>) -> String {
    timestamp.format("%H:%M").to_string()
}

/// Tells the view when to jump to the newest row: whenever the row count or
/// the in-flight text changed since the last observation.
#[derive(Debug, Default)]
pub struct ScrollFollower {
    rows: usize,
    pending: Option<String>,
}

impl ScrollFollower {
    pub fn observe(&mut self, transcript: &Transcript) -> bool {
        let rows = transcript.rows.len();
        let pending = transcript.pending_text().map(str::to_string);
        let changed = rows != self.rows || pending != self.pending;
        self.rows = rows;
        self.pending = pending;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TransportError;
    use crate::state::{ChatController, ChunkMode, TurnEvent};

    fn view(controller: &ChatController) -> Transcript {
        present(controller.history(), controller.assembler())
    }

    #[test]
    fn test_loading_row_until_first_visible_text() {
        let mut controller = ChatController::new(ChunkMode::Delta);
        let turn = controller.submit("hello").unwrap().turn;

        let transcript = view(&controller);
        assert_eq!(transcript.rows.len(), 2);
        assert_eq!(transcript.rows[1].body, RowBody::Loading);
        assert!(transcript.rows[1].pending);
        assert!(transcript.rows[0].time.is_some());

        controller.handle(TurnEvent::chunk(turn, "data: \n"));
        assert_eq!(view(&controller).rows[1].body, RowBody::Loading);

        controller.handle(TurnEvent::chunk(turn, "data: Hi"));
        assert_eq!(
            view(&controller).rows[1].body,
            RowBody::Text("Hi".to_string())
        );
    }

    #[test]
    fn test_committed_turn_has_no_pending_row() {
        let mut controller = ChatController::new(ChunkMode::Delta);
        let turn = controller.submit("hello").unwrap().turn;
        controller.handle(TurnEvent::chunk(turn, "Hi there"));
        controller.handle(TurnEvent::finish(turn));

        let transcript = view(&controller);
        assert_eq!(transcript.rows.len(), 2);
        assert!(transcript.rows.iter().all(|row| !row.pending));
        assert_eq!(transcript.pending_text(), None);
        assert_eq!(transcript.error, None);
    }

    #[test]
    fn test_failure_renders_error_outside_history() {
        let mut controller = ChatController::new(ChunkMode::Delta);
        let turn = controller.submit("x").unwrap().turn;
        controller.handle(TurnEvent::chunk(turn, "partial"));
        controller.handle(TurnEvent::failed(
            turn,
            TransportError::StreamAborted("reset".to_string()),
        ));

        let transcript = view(&controller);
        assert_eq!(transcript.rows.len(), 1);
        assert_eq!(
            transcript.error.as_deref(),
            Some("Error: completion stream aborted: reset")
        );
        assert_eq!(controller.history().len(), 1);

        controller.submit("x").unwrap();
        assert_eq!(view(&controller).error, None);
    }

    #[test]
    fn test_scroll_follows_rows_and_partial_text() {
        let mut controller = ChatController::new(ChunkMode::Delta);
        let mut follower = ScrollFollower::default();
        assert!(!follower.observe(&view(&controller)));

        let turn = controller.submit("hello").unwrap().turn;
        assert!(follower.observe(&view(&controller)));
        assert!(!follower.observe(&view(&controller)));

        controller.handle(TurnEvent::chunk(turn, "Hi"));
        assert!(follower.observe(&view(&controller)));
        controller.handle(TurnEvent::finish(turn));
        assert!(follower.observe(&view(&controller)));
    }
}
