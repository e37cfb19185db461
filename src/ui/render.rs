use super::transcript::{RowBody, Transcript, TranscriptRow};
use crate::types::Role;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthChar;

const LOADING_FRAMES: [&str; 3] = ["● · ·", "· ● ·", "· · ●"];
const USER_COLOR: Color = Color::Rgb(147, 51, 234);

pub fn loading_frame(tick: usize) -> &'static str {
    LOADING_FRAMES[tick % LOADING_FRAMES.len()]
}

pub fn transcript_lines(transcript: &Transcript, tick: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for row in &transcript.rows {
        lines.push(row_header(row));
        match &row.body {
            RowBody::Text(text) => lines.push(Line::from(text.clone())),
            RowBody::Loading => lines.push(Line::styled(
                loading_frame(tick),
                Style::default().fg(Color::Gray),
            )),
        }
        lines.push(Line::from(""));
    }

    if let Some(error) = &transcript.error {
        lines.push(Line::styled(
            error.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }
    lines
}

fn row_header(row: &TranscriptRow) -> Line<'static> {
    let (label, style) = match row.role {
        Role::User => ("You", Style::default().fg(USER_COLOR)),
        Role::Assistant => ("Assistant", Style::default().fg(Color::Cyan)),
    };
    let suffix = match (&row.time, row.pending) {
        (Some(time), _) => format!(" · {time}"),
        (None, true) => " · typing".to_string(),
        (None, false) => String::new(),
    };
    Line::from(vec![
        Span::styled(label, style.add_modifier(Modifier::BOLD)),
        Span::styled(suffix, Style::default().fg(Color::DarkGray)),
    ])
}

/// Scroll offset that puts the last wrapped row at the bottom of the area.
pub fn bottom_scroll_offset(lines: &[Line<'_>], width: u16, height: u16) -> u16 {
    let width = usize::from(width.max(1));
    let wrapped: usize = lines
        .iter()
        .map(|line| line.width().div_ceil(width).max(1))
        .sum();
    u16::try_from(wrapped.saturating_sub(usize::from(height))).unwrap_or(u16::MAX)
}

pub fn render_header(frame: &mut Frame<'_>, area: Rect, title: &str) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    frame.render_widget(
        Paragraph::new(truncate_line(title, area.width as usize))
            .alignment(Alignment::Left)
            .style(Style::default().add_modifier(Modifier::BOLD)),
        area,
    );
}

pub fn render_transcript(
    frame: &mut Frame<'_>,
    area: Rect,
    lines: Vec<Line<'static>>,
    scroll: u16,
) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        area,
    );
}

pub fn render_status_line(frame: &mut Frame<'_>, area: Rect, status: &str) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    frame.render_widget(
        Paragraph::new(truncate_line(status, area.width as usize))
            .style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

/// Single-line input box; the tail stays visible when the text overflows.
pub fn render_input(frame: &mut Frame<'_>, area: Rect, input: &str, busy: bool) {
    if area.height == 0 || area.width <= 2 {
        return;
    }
    let visible_width = area.width.saturating_sub(3) as usize;
    let visible = tail_to_display_width(input, visible_width);
    let style = if busy {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Gray)
    };
    frame.render_widget(
        Paragraph::new(format!("> {visible}")).style(style.bg(Color::Rgb(24, 24, 24))),
        area,
    );

    let cursor_offset = 2 + display_width(&visible) as u16;
    let cursor_x = area
        .x
        .saturating_add(cursor_offset)
        .min(area.x.saturating_add(area.width.saturating_sub(1)));
    frame.set_cursor_position((cursor_x, area.y));
}

fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

pub fn display_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

fn tail_to_display_width(text: &str, width: usize) -> String {
    let mut used = 0;
    let mut start = text.len();
    for (index, ch) in text.char_indices().rev() {
        let w = char_width(ch);
        if used + w > width {
            break;
        }
        used += w;
        start = index;
    }
    text[start..].to_string()
}

fn truncate_line(input: &str, width: usize) -> String {
    let width = width.max(1);
    if display_width(input) <= width {
        return input.to_string();
    }

    let budget = width.saturating_sub(3);
    let mut out = String::new();
    let mut used = 0;
    for ch in input.chars() {
        let w = char_width(ch);
        if used + w > budget {
            break;
        }
        out.push(ch);
        used += w;
    }
    if width >= 4 {
        out.push_str("...");
    }
    out
}
