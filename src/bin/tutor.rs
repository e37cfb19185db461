use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tutor_chat::api::ApiClient;
use tutor_chat::config::Config;
use tutor_chat::logging;
use tutor_chat::runtime::{ChatRuntime, UiUpdate};
use tutor_chat::session::{FileSessionStore, SessionStore};
use tutor_chat::state::ChatController;
use tutor_chat::terminal::TerminalGuard;
use tutor_chat::ui::layout::split_chat_layout;
use tutor_chat::ui::render::{
    bottom_scroll_offset, render_header, render_input, render_status_line, render_transcript,
    transcript_lines,
};
use tutor_chat::ui::{present, ScrollFollower};

const FRAME_INTERVAL: Duration = Duration::from_millis(33);
const LOADING_TICK_FRAMES: usize = 8;

struct ViewState {
    follow_latest: bool,
    scroll: u16,
    max_scroll: u16,
    frame: usize,
    notice: Option<String>,
    should_quit: bool,
}

impl ViewState {
    fn new() -> Self {
        Self {
            follow_latest: true,
            scroll: 0,
            max_scroll: 0,
            frame: 0,
            notice: None,
            should_quit: false,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing()?;
    let config = Config::load()?;
    config.validate()?;

    let session = config
        .session_path
        .as_ref()
        .map(|path| Arc::new(FileSessionStore::new(path)) as Arc<dyn SessionStore>);
    let client = ApiClient::new(&config, session)?;
    tracing::info!(url = client.api_url(), mode = ?config.chunk_mode, "starting tutor chat");

    let mut runtime = ChatRuntime::new(ChatController::from_config(&config), Arc::new(client));
    let mut updates = runtime.subscribe();

    let mut terminal = TerminalGuard::enter()?;
    let result = run(&mut terminal, &mut runtime, &mut updates, &config).await;
    runtime.cancel();
    drop(terminal);
    result
}

async fn run(
    terminal: &mut TerminalGuard,
    runtime: &mut ChatRuntime,
    updates: &mut mpsc::UnboundedReceiver<UiUpdate>,
    config: &Config,
) -> Result<()> {
    let mut view = ViewState::new();
    let mut follower = ScrollFollower::default();
    let mut ticker = tokio::time::interval(FRAME_INTERVAL);

    while !view.should_quit {
        runtime.drain_pending();
        while let Ok(update) = updates.try_recv() {
            log_update(&update);
        }

        let controller = runtime.controller();
        let transcript = present(controller.history(), controller.assembler());
        if follower.observe(&transcript) {
            view.follow_latest = true;
        }
        let lines = transcript_lines(&transcript, view.frame / LOADING_TICK_FRAMES);
        let busy = controller.is_busy();
        let input = controller.gate().input().to_string();
        let status = status_text(&view, busy);

        terminal.draw(|frame| {
            let panes = split_chat_layout(frame.area(), 1);
            view.max_scroll =
                bottom_scroll_offset(&lines, panes.transcript.width, panes.transcript.height);
            if view.follow_latest {
                view.scroll = view.max_scroll;
            }
            render_header(frame, panes.header, &config.title);
            render_transcript(frame, panes.transcript, lines, view.scroll.min(view.max_scroll));
            render_status_line(frame, panes.status, &status);
            render_input(frame, panes.input, &input, busy);
        })?;

        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    handle_key(key, runtime, &mut view);
                }
                Event::Paste(text) => {
                    runtime.controller_mut().gate_mut().input_mut().push_str(&text);
                }
                _ => {}
            }
        }

        view.frame = view.frame.wrapping_add(1);
        ticker.tick().await;
    }

    Ok(())
}

fn handle_key(key: KeyEvent, runtime: &mut ChatRuntime, view: &mut ViewState) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('d') if ctrl => view.should_quit = true,
        KeyCode::Enter => {
            if runtime.submit_input().is_some() {
                view.notice = None;
                view.follow_latest = true;
            } else if runtime.controller().is_busy() {
                view.notice = Some("still answering; Esc cancels".to_string());
            }
        }
        KeyCode::Esc => {
            if runtime.cancel().is_some() {
                view.notice = Some("response cancelled".to_string());
            }
        }
        KeyCode::Backspace => {
            runtime.controller_mut().gate_mut().input_mut().pop();
        }
        KeyCode::PageUp => {
            view.follow_latest = false;
            view.scroll = view.scroll.saturating_sub(10);
        }
        KeyCode::PageDown => {
            view.scroll = view.scroll.saturating_add(10).min(view.max_scroll);
            view.follow_latest = view.scroll >= view.max_scroll;
        }
        KeyCode::End => view.follow_latest = true,
        KeyCode::Char(ch) if !ctrl => {
            runtime.controller_mut().gate_mut().input_mut().push(ch);
        }
        _ => {}
    }
}

fn status_text(view: &ViewState, busy: bool) -> String {
    let mode = if busy {
        "streaming · Esc cancel"
    } else {
        "ready · Enter send"
    };
    let follow = if view.follow_latest { "following" } else { "scrolled" };
    match &view.notice {
        Some(notice) => format!("{mode} · {follow} · {notice} · Ctrl-C quit"),
        None => format!("{mode} · {follow} · Ctrl-C quit"),
    }
}

fn log_update(update: &UiUpdate) {
    match update {
        UiUpdate::MessageAdded(message) => {
            tracing::info!(role = %message.role, chars = message.content.len(), "message added");
        }
        UiUpdate::StreamDelta { turn, display: text } => {
            tracing::trace!(%turn, chars = text.len(), "partial");
        }
        UiUpdate::TurnComplete { turn } => tracing::debug!(%turn, "turn complete"),
        UiUpdate::TurnCancelled { turn } => tracing::info!(%turn, "turn cancelled"),
        UiUpdate::Error { turn, error } => tracing::warn!(%turn, %error, "turn failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_chat::api::TransportError;
    use tutor_chat::state::{ChunkMode, Message};

    #[test]
    fn test_log_update_accepts_every_update_kind() {
        let mut controller = ChatController::new(ChunkMode::Delta);
        let turn = controller.submit("hello").unwrap().turn;

        log_update(&UiUpdate::MessageAdded(Message::user("hello")));
        log_update(&UiUpdate::StreamDelta {
            turn,
            display: "Hi".to_string(),
        });
        log_update(&UiUpdate::TurnComplete { turn });
        log_update(&UiUpdate::TurnCancelled { turn });
        log_update(&UiUpdate::Error {
            turn,
            error: TransportError::StreamAborted("reset".to_string()),
        });
    }

    #[test]
    fn test_status_text_reflects_busy_and_notice() {
        let mut view = ViewState::new();
        assert!(status_text(&view, false).starts_with("ready"));

        view.notice = Some("response cancelled".to_string());
        view.follow_latest = false;
        let status = status_text(&view, true);
        assert!(status.starts_with("streaming"));
        assert!(status.contains("scrolled"));
        assert!(status.contains("response cancelled"));
    }
}
