use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChatLayout {
    pub header: Rect,
    pub transcript: Rect,
    pub status: Rect,
    pub input: Rect,
}

/// Title row, scrolling transcript, one status row, input box at the bottom.
pub fn split_chat_layout(area: Rect, input_rows: u16) -> ChatLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(input_rows.max(1)),
        ])
        .split(area);

    ChatLayout {
        header: chunks[0],
        transcript: chunks[1],
        status: chunks[2],
        input: chunks[3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_stacks_header_transcript_status_input() {
        let panes = split_chat_layout(Rect::new(0, 0, 80, 20), 3);

        assert_eq!(panes.header.height, 1);
        assert_eq!(panes.transcript.height, 15);
        assert_eq!(panes.status.height, 1);
        assert_eq!(panes.input.height, 3);
        assert_eq!(panes.transcript.y, 1);
        assert_eq!(panes.status.y, 16);
        assert_eq!(panes.input.y, 17);
    }

    #[test]
    fn layout_never_collapses_input() {
        let panes = split_chat_layout(Rect::new(0, 0, 40, 10), 0);
        assert_eq!(panes.input.height, 1);
    }
}
