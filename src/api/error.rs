use thiserror::Error;

/// Failure of the completion transport for the current turn.
///
/// Always recoverable: the turn is dropped, the submission lock is released
/// and the message is shown inline. Variants hold rendered strings so the
/// error can be cloned into presentation state and UI notifications.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("cannot reach completion endpoint '{url}': {detail}")]
    Unreachable { url: String, detail: String },
    #[error("completion request to '{url}' timed out")]
    Timeout { url: String },
    #[error("completion endpoint '{url}' returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("completion stream aborted: {0}")]
    StreamAborted(String),
    #[error("completion request failed: {0}")]
    Request(String),
}

impl TransportError {
    pub fn from_reqwest(error: reqwest::Error, request_url: &str) -> Self {
        let url = request_url.to_string();
        if error.is_connect() {
            return Self::Unreachable {
                url,
                detail: error.to_string(),
            };
        }
        if error.is_timeout() {
            return Self::Timeout { url };
        }
        if let Some(status) = error.status() {
            return Self::Status {
                url,
                status: status.as_u16(),
            };
        }
        if error.is_body() || error.is_decode() {
            return Self::StreamAborted(error.to_string());
        }
        Self::Request(error.to_string())
    }
}
