use super::event::UiUpdate;
use super::stream_task::pump_stream;
use crate::api::CompletionService;
use crate::state::{ChatController, EventEffect, Submission, TurnEvent, TurnId, TurnOutcome};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct ActiveStream {
    turn: TurnId,
    cancel: CancellationToken,
}

/// Event-driven owner of a [`ChatController`].
///
/// Network I/O runs in a spawned task per turn; its events come back over a
/// channel and are applied here one at a time, so controller state is only
/// ever touched from the task that owns the runtime.
pub struct ChatRuntime {
    controller: ChatController,
    service: Arc<dyn CompletionService>,
    event_tx: mpsc::UnboundedSender<TurnEvent>,
    event_rx: mpsc::UnboundedReceiver<TurnEvent>,
    update_tx: Option<mpsc::UnboundedSender<UiUpdate>>,
    active: Option<ActiveStream>,
}

impl ChatRuntime {
    pub fn new(controller: ChatController, service: Arc<dyn CompletionService>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            controller,
            service,
            event_tx,
            event_rx,
            update_tx: None,
            active: None,
        }
    }

    /// Routes [`UiUpdate`]s to the returned receiver; replaces any previous one.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<UiUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.update_tx = Some(tx);
        rx
    }

    pub fn controller(&self) -> &ChatController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ChatController {
        &mut self.controller
    }

    pub fn active_turn(&self) -> Option<TurnId> {
        self.active.as_ref().map(|active| active.turn)
    }

    pub fn submit(&mut self, text: &str) -> Option<TurnId> {
        let submission = self.controller.submit(text)?;
        Some(self.start(submission))
    }

    pub fn submit_input(&mut self) -> Option<TurnId> {
        let submission = self.controller.submit_input()?;
        Some(self.start(submission))
    }

    fn start(&mut self, submission: Submission) -> TurnId {
        let Submission {
            turn,
            request,
            user_message,
        } = submission;
        self.emit(UiUpdate::MessageAdded(user_message));

        let cancel = CancellationToken::new();
        tokio::spawn(pump_stream(
            Arc::clone(&self.service),
            request,
            turn,
            cancel.clone(),
            self.event_tx.clone(),
        ));
        self.active = Some(ActiveStream { turn, cancel });
        turn
    }

    /// Waits for the next stream event and applies it. `None` when no turn
    /// is streaming.
    pub async fn next_effect(&mut self) -> Option<EventEffect> {
        self.active.as_ref()?;
        let event = self.event_rx.recv().await?;
        Some(self.apply(event))
    }

    /// Applies every event already queued, without waiting.
    pub fn drain_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.event_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    pub fn apply(&mut self, event: TurnEvent) -> EventEffect {
        let effect = self.controller.handle(event);
        self.publish(&effect);
        effect
    }

    fn publish(&mut self, effect: &EventEffect) {
        match effect {
            EventEffect::Ignored => {}
            EventEffect::Partial(display) => {
                if let Some(turn) = self.active_turn() {
                    self.emit(UiUpdate::StreamDelta {
                        turn,
                        display: display.clone(),
                    });
                }
            }
            EventEffect::Finished { turn, outcome } => {
                if self.active_turn() == Some(*turn) {
                    self.active = None;
                }
                match outcome {
                    TurnOutcome::Committed(message) => {
                        self.emit(UiUpdate::MessageAdded(message.clone()));
                        self.emit(UiUpdate::TurnComplete { turn: *turn });
                    }
                    TurnOutcome::Failed(error) => self.emit(UiUpdate::Error {
                        turn: *turn,
                        error: error.clone(),
                    }),
                    TurnOutcome::Cancelled => self.emit(UiUpdate::TurnCancelled { turn: *turn }),
                }
            }
        }
    }

    /// Tears down the streaming turn. Events it already queued are dropped
    /// by turn id when applied.
    pub fn cancel(&mut self) -> Option<TurnId> {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
        let effect = self.controller.cancel();
        self.publish(&effect);
        match effect {
            EventEffect::Finished { turn, .. } => Some(turn),
            _ => None,
        }
    }

    /// Submits `text` and drives events until that turn ends.
    pub async fn run_turn(&mut self, text: &str) -> Option<TurnOutcome> {
        let turn = self.submit(text)?;
        loop {
            if let EventEffect::Finished {
                turn: finished,
                outcome,
            } = self.next_effect().await?
            {
                if finished == turn {
                    return Some(outcome);
                }
            }
        }
    }

    fn emit(&self, update: UiUpdate) {
        if let Some(tx) = &self.update_tx {
            let _ = tx.send(update);
        }
    }
}

impl Drop for ChatRuntime {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }
}
