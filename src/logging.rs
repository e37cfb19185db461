use crate::util::{env_flag, non_empty_env};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_PATH: &str = "/tmp/tutor-chat.log";
const DEFAULT_LOG_FILTER: &str = "info";
const LOG_PATH_ENV: &str = "TUTOR_LOG_PATH";
const LOG_FILTER_ENV: &str = "TUTOR_LOG";
const DEBUG_PAYLOAD_ENV: &str = "TUTOR_DEBUG_PAYLOAD";

/// Installs the global subscriber.
///
/// Output goes to `TUTOR_LOG_PATH` when set. Otherwise a terminal stderr means
/// the TUI owns the screen, so logs go to a temp file; a redirected stderr
/// receives them directly.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match resolve_log_path() {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {path}"))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|error| anyhow!("failed to install tracing subscriber: {error}"))
}

pub fn debug_payload_enabled() -> bool {
    env_flag(DEBUG_PAYLOAD_ENV)
}

pub fn emit_debug_payload<T: Serialize + ?Sized>(request_url: &str, payload: &T) {
    let formatted = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    tracing::debug!(url = request_url, "outbound completion payload:\n{formatted}");
}

fn resolve_log_path() -> Option<String> {
    non_empty_env(LOG_PATH_ENV).or_else(|| {
        if std::io::stderr().is_terminal() {
            Some(DEFAULT_LOG_PATH.to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_payload_enabled_accepts_true_variants() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var(DEBUG_PAYLOAD_ENV, "1");
        assert!(debug_payload_enabled());
        std::env::set_var(DEBUG_PAYLOAD_ENV, "TRUE");
        assert!(debug_payload_enabled());
        std::env::set_var(DEBUG_PAYLOAD_ENV, "nope");
        assert!(!debug_payload_enabled());
        std::env::remove_var(DEBUG_PAYLOAD_ENV);
    }

    #[test]
    fn test_resolve_log_path_prefers_env() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var(LOG_PATH_ENV, " /tmp/tutor-test.log ");
        assert_eq!(resolve_log_path().as_deref(), Some("/tmp/tutor-test.log"));
        std::env::remove_var(LOG_PATH_ENV);
    }
}
