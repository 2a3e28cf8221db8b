//! Low-level, transport-agnostic session backend trait and shared helpers
//!
//! This crate defines the contract every agent-session transport must satisfy
//! (local tmux, Coop HTTP sidecar, ...), without any knowledge of how a
//! particular agent is located or configured.

pub mod error;

pub use error::{BoxError, TerminalError};

use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, TerminalError>;

/// Terminal capture and input for agent sessions.
///
/// Contract shared by every implementation:
/// - `has_session` answers `Ok(false)` when the session simply does not exist
///   and only errors on a transport fault worth investigating.
/// - `capture_pane(session, 0)` returns the full available text; any other
///   count returns at most that many trailing lines without a trailing newline.
/// - `send_keys` with empty input is a no-op and touches no transport.
/// - `nudge_session` fails when the transport reports the message was not
///   delivered, and the error carries the reported reason.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Implementation identifier (e.g., "tmux", "coop").
    fn id(&self) -> &'static str;

    /// Check whether a session exists and is running.
    async fn has_session(&self, session: &str) -> Result<bool>;

    /// Capture the last `lines` lines of output (`0` = everything available).
    async fn capture_pane(&self, session: &str, lines: usize) -> Result<String>;

    /// Capture the full available output.
    async fn capture_pane_all(&self, session: &str) -> Result<String>;

    /// Capture the last `lines` lines as separate strings.
    async fn capture_pane_lines(&self, session: &str, lines: usize) -> Result<Vec<String>> {
        let text = self.capture_pane(session, lines).await?;
        Ok(split_lines(&text))
    }

    /// Deliver a message to the agent's input stream, followed by Enter.
    async fn nudge_session(&self, session: &str, message: &str) -> Result<()>;

    /// Send whitespace-separated named keys (e.g. "Enter Escape").
    async fn send_keys(&self, session: &str, keys: &str) -> Result<()>;

    /// Check whether the process behind the session has exited.
    async fn is_pane_dead(&self, session: &str) -> Result<bool>;

    /// Arrange for a notification when the agent's pane dies. May be a no-op.
    async fn set_pane_died_hook(&self, session: &str, agent_id: &str) -> Result<()>;
}

/// Keep at most the last `lines` lines of `text`; `0` keeps everything.
/// A final newline ends the last line and is not kept.
pub fn tail_lines(text: &str, lines: usize) -> String {
    if lines == 0 {
        return text.to_string();
    }
    let text = text.strip_suffix('\n').unwrap_or(text);
    let all: Vec<&str> = text.split('\n').collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

/// Split captured text into lines, dropping a single trailing empty line.
pub fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.lines().map(str::to_string).collect()
}

/// Split a key string into individual key names.
pub fn key_names(keys: &str) -> Vec<&str> {
    keys.split_whitespace().collect()
}
