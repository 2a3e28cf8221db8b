//! tmux session backend
//!
//! Implements the Backend trait for locally running agents by shelling out to
//! the tmux command-line interface. Every invocation is independent: no server
//! connection or handle is kept between calls.

use async_trait::async_trait;
use gt_terminal_core::*;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Hard limit for a single tmux invocation.
pub const TMUX_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause between typing a nudge and pressing Enter, so the agent's input
/// handler sees the text before the submit key.
const NUDGE_SETTLE: Duration = Duration::from_millis(500);

/// stderr fragments tmux prints when the target session is simply absent.
const SESSION_ABSENT_MARKERS: [&str; 3] = [
    "session not found",
    "can't find session",
    "no server running",
];

/// tmux backend for agents running in local sessions
#[derive(Debug, Clone)]
pub struct TmuxBackend {
    binary: PathBuf,
    timeout: Duration,
    /// Command run by the pane-died hook; receives `--agent` and `--session`.
    crash_command: String,
}

impl Default for TmuxBackend {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tmux"),
            timeout: TMUX_TIMEOUT,
            crash_command: "gt log crash".to_string(),
        }
    }
}

impl TmuxBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific tmux binary instead of the one on PATH.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Override the per-invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_crash_command(mut self, command: impl Into<String>) -> Self {
        self.crash_command = command.into();
        self
    }

    /// Run a tmux command and return its trimmed stdout
    async fn run_tmux_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TerminalError::NotAvailable("tmux"));
            }
            Ok(Err(e)) => return Err(TerminalError::Io(e)),
            Err(_) => {
                return Err(TerminalError::Timeout {
                    command: "tmux".to_string(),
                    args: args.iter().map(|a| a.to_string()).collect(),
                    timeout: self.timeout,
                });
            }
        };

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }

        let subcommand = args.first().copied().unwrap_or_default();
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            Err(TerminalError::CommandFailed(format!(
                "tmux {}: {}",
                subcommand, output.status
            )))
        } else {
            Err(TerminalError::CommandFailed(format!(
                "tmux {}: {}",
                subcommand, stderr
            )))
        }
    }

    /// Check whether the tmux binary can be executed.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-V")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Start a detached session running `command`, optionally in `work_dir`.
    pub async fn new_session(
        &self,
        name: &str,
        work_dir: Option<&std::path::Path>,
        command: &str,
    ) -> Result<()> {
        let work_dir = work_dir.map(|d| d.to_string_lossy().to_string());
        let mut args = vec!["new-session", "-d", "-s", name];
        if let Some(dir) = work_dir.as_deref() {
            args.extend_from_slice(&["-c", dir]);
        }
        args.push(command);
        self.run_tmux_command(&args).await?;
        Ok(())
    }

    /// Kill a session and every process attached to it.
    pub async fn kill_session(&self, name: &str) -> Result<()> {
        let target = exact_target(name);
        self.run_tmux_command(&["kill-session", "-t", &target]).await?;
        Ok(())
    }

    /// Keep (or stop keeping) a pane around after its process exits.
    pub async fn set_remain_on_exit(&self, pane: &str, on: bool) -> Result<()> {
        let target = exact_target(pane);
        let value = if on { "on" } else { "off" };
        self.run_tmux_command(&["set-option", "-t", &target, "remain-on-exit", value])
            .await?;
        Ok(())
    }

    async fn capture(&self, session: &str, start: &str) -> Result<String> {
        let target = exact_target(session);
        self.run_tmux_command(&["capture-pane", "-p", "-t", &target, "-S", start])
            .await
    }
}

/// tmux target syntax for an exact session-name match.
fn exact_target(name: &str) -> String {
    format!("={}", name)
}

fn pane_died_hook(crash_command: &str, session: &str, agent_id: &str) -> String {
    format!(
        "run-shell \"{} --agent '{}' --session '{}'\"",
        crash_command, agent_id, session
    )
}

#[async_trait]
impl Backend for TmuxBackend {
    fn id(&self) -> &'static str {
        "tmux"
    }

    async fn has_session(&self, session: &str) -> Result<bool> {
        let target = exact_target(session);
        match self.run_tmux_command(&["has-session", "-t", &target]).await {
            Ok(_) => Ok(true),
            Err(TerminalError::CommandFailed(message))
                if SESSION_ABSENT_MARKERS.iter().any(|m| message.contains(m)) =>
            {
                debug!(session, "tmux session absent: {}", message);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn capture_pane(&self, session: &str, lines: usize) -> Result<String> {
        if lines == 0 {
            return self.capture_pane_all(session).await;
        }
        // -S counts back into history, so the visible screen can add lines.
        let text = self.capture(session, &format!("-{}", lines)).await?;
        Ok(tail_lines(&text, lines))
    }

    async fn capture_pane_all(&self, session: &str) -> Result<String> {
        self.capture(session, "-").await
    }

    async fn nudge_session(&self, session: &str, message: &str) -> Result<()> {
        let target = exact_target(session);
        self.run_tmux_command(&["send-keys", "-t", &target, "-l", message])
            .await?;
        tokio::time::sleep(NUDGE_SETTLE).await;
        self.run_tmux_command(&["send-keys", "-t", &target, "Enter"])
            .await?;
        Ok(())
    }

    async fn send_keys(&self, session: &str, keys: &str) -> Result<()> {
        let names = key_names(keys);
        if names.is_empty() {
            return Ok(());
        }
        let target = exact_target(session);
        let mut args = vec!["send-keys", "-t", target.as_str()];
        args.extend(names);
        self.run_tmux_command(&args).await?;
        Ok(())
    }

    async fn is_pane_dead(&self, session: &str) -> Result<bool> {
        let target = exact_target(session);
        let out = self
            .run_tmux_command(&["display-message", "-t", &target, "-p", "#{pane_dead}"])
            .await?;
        Ok(out.trim() == "1")
    }

    async fn set_pane_died_hook(&self, session: &str, agent_id: &str) -> Result<()> {
        self.set_remain_on_exit(session, true).await?;
        let target = exact_target(session);
        let hook = pane_died_hook(&self.crash_command, session, agent_id);
        self.run_tmux_command(&["set-hook", "-t", &target, "pane-died", &hook])
            .await?;
        Ok(())
    }
}
