use super::client::{ByteStream, CompletionService};
use super::error::TransportError;
use crate::types::ChatRequest;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// One scripted reply of [`MockCompletionService`].
pub enum MockReply {
    /// Streams the chunks, then closes normally.
    Chunks(Vec<String>),
    /// Streams the chunks, then fails with the error.
    FailAfter(Vec<String>, TransportError),
    /// Refuses to open the stream at all.
    Refuse(TransportError),
    /// Raw bytes, for exercising chunk boundaries inside characters.
    Bytes(Vec<Vec<u8>>),
    /// Chunks are pushed by the test through the paired sender; dropping the
    /// sender closes the stream.
    Live(mpsc::UnboundedReceiver<Result<Bytes, TransportError>>),
}

impl MockReply {
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Chunks(chunks.into_iter().map(Into::into).collect())
    }

    pub fn live() -> (mpsc::UnboundedSender<Result<Bytes, TransportError>>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::Live(rx))
    }
}

/// In-memory completion service that replays scripted replies in order and
/// records every request it receives.
#[derive(Clone, Default)]
pub struct MockCompletionService {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockCompletionService {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CompletionService for MockCompletionService {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let reply = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .ok_or_else(|| {
                TransportError::Request("mock completion service has no reply configured".into())
            })?;

        let stream: ByteStream = match reply {
            MockReply::Chunks(chunks) => Box::pin(stream::iter(
                chunks
                    .into_iter()
                    .map(|chunk| Ok::<_, TransportError>(Bytes::from(chunk))),
            )),
            MockReply::FailAfter(chunks, error) => Box::pin(stream::iter(
                chunks
                    .into_iter()
                    .map(|chunk| Ok(Bytes::from(chunk)))
                    .chain(std::iter::once(Err(error))),
            )),
            MockReply::Refuse(error) => return Err(error),
            MockReply::Bytes(chunks) => Box::pin(stream::iter(
                chunks
                    .into_iter()
                    .map(|chunk| Ok::<_, TransportError>(Bytes::from(chunk))),
            )),
            MockReply::Live(rx) => Box::pin(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })),
        };
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_replies_are_consumed_in_order_and_requests_recorded() {
        let service = MockCompletionService::new(vec![
            MockReply::chunks(["a", "b"]),
            MockReply::Refuse(TransportError::Timeout {
                url: "mock".to_string(),
            }),
        ]);
        let request = ChatRequest {
            message: "q".to_string(),
            history: Vec::new(),
        };

        let stream = service.open_stream(&request).await.unwrap();
        let chunks: Vec<_> = stream.collect().await;
        assert_eq!(chunks.len(), 2);
        assert!(service.open_stream(&request).await.is_err());
        assert!(service.open_stream(&request).await.is_err());
        assert_eq!(service.requests().len(), 3);
    }
}
