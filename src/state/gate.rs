use super::history::HistoryStore;
use crate::types::ChatRequest;

/// Guards submission: one outstanding request at a time, no blank input.
#[derive(Debug, Default)]
pub struct SubmissionGate {
    locked: bool,
    input: String,
}

impl SubmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn can_submit(&self, input: &str) -> bool {
        !self.locked && !input.trim().is_empty()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    /// Packages the request for `text` against the history as it stands now,
    /// i.e. before the new user turn is appended. `None` when submission is
    /// not currently allowed.
    pub fn prepare(&self, text: &str, history: &HistoryStore) -> Option<ChatRequest> {
        if !self.can_submit(text) {
            tracing::debug!(locked = self.locked, "submission rejected");
            return None;
        }

        Some(ChatRequest {
            message: text.to_string(),
            history: history.to_request_history(),
        })
    }

    /// Raises the lock and clears the pending input field.
    pub fn lock(&mut self) {
        self.locked = true;
        self.input.clear();
    }

    pub fn release(&mut self) {
        self.locked = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::history::Message;

    #[test]
    fn test_blank_input_cannot_be_submitted() {
        let gate = SubmissionGate::new();
        assert!(!gate.can_submit(""));
        assert!(!gate.can_submit("  \n\t"));
        assert!(gate.can_submit(" hi "));
    }

    #[test]
    fn test_lock_blocks_every_input() {
        let mut gate = SubmissionGate::new();
        gate.lock();
        assert!(!gate.can_submit("hello"));
        assert!(gate.prepare("hello", &HistoryStore::new()).is_none());

        gate.release();
        assert!(gate.can_submit("hello"));
    }

    #[test]
    fn test_prepare_serializes_prior_history_only() {
        let mut history = HistoryStore::new();
        history.append(Message::user("a"));
        history.append(Message::assistant("b"));
        let gate = SubmissionGate::new();

        let request = gate.prepare("c", &history).unwrap();
        assert_eq!(request.message, "c");
        assert_eq!(request.history.len(), 2);
        assert_eq!(request.history[1].content, "b");
    }

    #[test]
    fn test_lock_clears_pending_input() {
        let mut gate = SubmissionGate::new();
        gate.set_input("draft");
        gate.lock();
        assert_eq!(gate.input(), "");
        assert!(gate.is_locked());
    }
}
