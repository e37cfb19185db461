use crate::api::{ChunkDecoder, CompletionService, TransportError};
use crate::state::{TurnEvent, TurnId};
use crate::types::ChatRequest;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Event sender for one turn. If the pump goes away without having sent a
/// terminal event and the turn was not cancelled, dropping it reports the
/// turn as failed so the submission lock is never left raised.
struct TurnSender {
    turn: TurnId,
    cancel: CancellationToken,
    event_tx: mpsc::UnboundedSender<TurnEvent>,
    settled: bool,
}

impl TurnSender {
    fn send(&mut self, event: TurnEvent) -> bool {
        self.settled |= event.is_terminal();
        self.event_tx.send(event).is_ok()
    }
}

impl Drop for TurnSender {
    fn drop(&mut self) {
        if self.settled || self.cancel.is_cancelled() {
            return;
        }
        tracing::warn!(turn = %self.turn, "stream task ended without a terminal event");
        let _ = self.event_tx.send(TurnEvent::failed(
            self.turn,
            TransportError::StreamAborted("stream task ended unexpectedly".to_string()),
        ));
    }
}

/// Drives one completion stream and forwards it as turn events, in arrival
/// order. Ends with exactly one terminal event unless cancelled first, in
/// which case nothing more is sent.
pub(super) async fn pump_stream(
    service: Arc<dyn CompletionService>,
    request: ChatRequest,
    turn: TurnId,
    cancel: CancellationToken,
    event_tx: mpsc::UnboundedSender<TurnEvent>,
) {
    let mut sender = TurnSender {
        turn,
        cancel: cancel.clone(),
        event_tx,
        settled: false,
    };

    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        opened = service.open_stream(&request) => opened,
    };
    let mut stream = match opened {
        Ok(stream) => stream,
        Err(error) => {
            sender.send(TurnEvent::failed(turn, error));
            return;
        }
    };

    let mut decoder = ChunkDecoder::new();
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(%turn, "stream task cancelled");
                return;
            }
            next = stream.next() => next,
        };

        let event = match next {
            Some(Ok(bytes)) => {
                let text = decoder.decode(&bytes);
                if text.is_empty() {
                    continue;
                }
                TurnEvent::chunk(turn, text)
            }
            Some(Err(error)) => {
                sender.send(TurnEvent::failed(turn, error));
                return;
            }
            None => {
                let tail = decoder.finish();
                if !tail.is_empty() {
                    sender.send(TurnEvent::chunk(turn, tail));
                }
                sender.send(TurnEvent::finish(turn));
                return;
            }
        };

        if !sender.send(event) {
            return;
        }
    }
}
