use crate::state::ChunkMode;
use crate::util::{is_local_endpoint_url, non_empty_env};
use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/agent/host_agent";
pub const DEFAULT_TITLE: &str = "AI Assistant";
pub const DEFAULT_GREETING: &str =
    "👋 Hi there! I'm your AI assistant for this course. How can I help you today?";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const MAX_CONNECT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_url: String,
    pub title: String,
    /// Seeded as the first assistant message of an empty conversation.
    pub greeting: Option<String>,
    pub chunk_mode: ChunkMode,
    pub connect_timeout_secs: u64,
    pub session_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            title: DEFAULT_TITLE.to_string(),
            greeting: Some(DEFAULT_GREETING.to_string()),
            chunk_mode: ChunkMode::Delta,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            session_path: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let api_url = non_empty_env("TUTOR_API_URL").unwrap_or(defaults.api_url);
        let title = non_empty_env("TUTOR_TITLE").unwrap_or(defaults.title);
        // Set-but-blank disables the greeting; unset keeps the default.
        let greeting = match std::env::var("TUTOR_GREETING") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(value),
            Err(_) => defaults.greeting,
        };
        let chunk_mode = match non_empty_env("TUTOR_CHUNK_MODE") {
            Some(value) => match ChunkMode::parse(&value) {
                Some(mode) => mode,
                None => bail!("Invalid TUTOR_CHUNK_MODE '{value}': expected 'delta' or 'cumulative'"),
            },
            None => defaults.chunk_mode,
        };
        let connect_timeout_secs = match non_empty_env("TUTOR_CONNECT_TIMEOUT_SECS") {
            Some(value) => value
                .parse::<u64>()
                .with_context(|| format!("Invalid TUTOR_CONNECT_TIMEOUT_SECS '{value}'"))?,
            None => defaults.connect_timeout_secs,
        };
        let session_path = non_empty_env("TUTOR_SESSION_PATH").map(PathBuf::from);

        Ok(Self {
            api_url,
            title,
            greeting,
            chunk_mode,
            connect_timeout_secs,
            session_path,
        })
    }

    pub fn validate(&self) -> Result<()> {
        let url = match Url::parse(self.api_url.trim()) {
            Ok(url) => url,
            Err(error) => bail!("Invalid TUTOR_API_URL '{}': {}", self.api_url, error),
        };

        match url.scheme() {
            "https" => {}
            "http" if self.is_local_endpoint() => {}
            "http" => bail!(
                "TUTOR_API_URL '{}' uses plain http for a non-local host; use https",
                self.api_url
            ),
            other => bail!(
                "Invalid TUTOR_API_URL '{}': unsupported scheme '{}', expected http:// or https://",
                self.api_url,
                other
            ),
        }

        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > MAX_CONNECT_TIMEOUT_SECS {
            bail!(
                "TUTOR_CONNECT_TIMEOUT_SECS must be between 1 and {MAX_CONNECT_TIMEOUT_SECS}, got {}",
                self.connect_timeout_secs
            );
        }

        if self.title.trim().is_empty() {
            bail!("TUTOR_TITLE must not be blank");
        }

        Ok(())
    }

    pub fn is_local_endpoint(&self) -> bool {
        is_local_endpoint_url(&self.api_url)
    }
}
