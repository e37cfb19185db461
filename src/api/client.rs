use super::error::TransportError;
use crate::config::Config;
use crate::logging::{debug_payload_enabled, emit_debug_payload};
use crate::session::{read_credential, SessionStore};
use crate::types::ChatRequest;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// The remote completion endpoint: one request in, one text byte stream out.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, TransportError>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_url: String,
    session: Option<Arc<dyn SessionStore>>,
}

impl ApiClient {
    pub fn new(config: &Config, session: Option<Arc<dyn SessionStore>>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            session,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl CompletionService for ApiClient {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, TransportError> {
        let mut builder = self
            .http
            .post(&self.api_url)
            .header("content-type", "application/json")
            .json(request);

        let credential = self
            .session
            .as_deref()
            .and_then(|store| read_credential(store));
        if let Some(credential) = credential {
            builder = builder.bearer_auth(credential.access_token);
        }

        if debug_payload_enabled() {
            emit_debug_payload(&self.api_url, request);
        }
        tracing::debug!(
            url = %self.api_url,
            history_len = request.history.len(),
            "opening completion stream"
        );

        let response = builder
            .send()
            .await
            .map_err(|error| TransportError::from_reqwest(error, &self.api_url))?
            .error_for_status()
            .map_err(|error| TransportError::from_reqwest(error, &self.api_url))?;

        let request_url = self.api_url.clone();
        let stream = response
            .bytes_stream()
            .map(move |item| item.map_err(|error| TransportError::from_reqwest(error, &request_url)));
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChunkMode;
    use crate::session::{MemorySessionStore, ACCESS_TOKEN_KEY};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn test_config(api_url: String) -> Config {
        Config {
            api_url,
            title: "AI Assistant".to_string(),
            greeting: None,
            chunk_mode: ChunkMode::Delta,
            connect_timeout_secs: 2,
            session_path: None,
        }
    }

    /// Accepts one connection, captures the raw request, replies with `response`.
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let lower = line.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .and_then(|v| v.trim().parse::<usize>().ok())
                        })
                        .unwrap_or(0);
                    if received.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&received).into_owned()
        });
        (format!("http://{addr}/api/agent/host_agent"), handle)
    }

    #[tokio::test]
    async fn test_open_stream_posts_json_and_streams_body() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 8\r\nconnection: close\r\n\r\nHi there",
        )
        .await;
        let session = Arc::new(MemorySessionStore::default());
        session.set(ACCESS_TOKEN_KEY, "tok-123").unwrap();
        let client = ApiClient::new(&test_config(url), Some(session)).unwrap();

        let request = ChatRequest {
            message: "hello".to_string(),
            history: Vec::new(),
        };
        let mut stream = client.open_stream(&request).await.unwrap();
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(body, b"Hi there");

        let raw_request = server.await.unwrap();
        assert!(raw_request.starts_with("POST /api/agent/host_agent"));
        assert!(raw_request
            .to_ascii_lowercase()
            .contains("authorization: bearer tok-123"));
        assert!(raw_request.contains(r#"{"message":"hello","history":[]}"#));
    }

    #[tokio::test]
    async fn test_non_success_status_is_transport_error() {
        let (url, server) = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;
        let client = ApiClient::new(&test_config(url.clone()), None).unwrap();

        let request = ChatRequest {
            message: "hello".to_string(),
            history: Vec::new(),
        };
        let error = match client.open_stream(&request).await {
            Ok(_) => panic!("500 must not open a stream"),
            Err(error) => error,
        };
        assert_eq!(error, TransportError::Status { url, status: 500 });
        let raw_request = server.await.unwrap();
        assert!(!raw_request.to_ascii_lowercase().contains("authorization:"));
    }
}
