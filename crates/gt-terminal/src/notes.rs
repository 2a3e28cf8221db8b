//! Agent metadata notes lookup
//!
//! Agents carry free-form `key: value` notes in the issue store. The resolver
//! only needs two queries from it, so they are behind a small trait; the
//! production implementation shells out to the `bd` CLI.

use async_trait::async_trait;
use gt_terminal_core::{Result, TerminalError};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

pub const BD_TIMEOUT: Duration = Duration::from_secs(10);

/// Label carried by every agent record.
pub const AGENT_LABEL: &str = "gt:agent";

/// Source of agent metadata notes
#[async_trait]
pub trait NotesSource: Send + Sync {
    /// Notes text of the agent record `id`.
    async fn agent_notes(&self, id: &str) -> Result<String>;

    /// Ids of every known agent record. Used to resolve bare agent names.
    async fn agent_ids(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct IssueNotes {
    #[serde(default)]
    notes: String,
}

#[derive(Debug, Deserialize)]
struct IssueId {
    id: String,
}

/// Reads notes through `bd show <id> --json`
#[derive(Debug, Clone)]
pub struct BdNotesSource {
    binary: PathBuf,
    timeout: Duration,
}

impl Default for BdNotesSource {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("bd"),
            timeout: BD_TIMEOUT,
        }
    }
}

impl BdNotesSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run_bd(&self, args: &[&str]) -> Result<Vec<u8>> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TerminalError::NotAvailable("bd"));
            }
            Ok(Err(e)) => return Err(TerminalError::Io(e)),
            Err(_) => {
                return Err(TerminalError::Timeout {
                    command: "bd".to_string(),
                    args: args.iter().map(|a| a.to_string()).collect(),
                    timeout: self.timeout,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TerminalError::CommandFailed(format!(
                "bd {} failed: {}",
                args.first().copied().unwrap_or_default(),
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

/// First issue's notes from `bd show --json` output.
pub fn parse_show_output(id: &str, output: &[u8]) -> Result<String> {
    let issues: Vec<IssueNotes> = serde_json::from_slice(output)
        .map_err(|e| TerminalError::Other(format!("failed to parse bd show output: {}", e)))?;
    issues
        .into_iter()
        .next()
        .map(|issue| issue.notes)
        .ok_or_else(|| TerminalError::NotFound(format!("agent bead {:?} not found", id)))
}

#[async_trait]
impl NotesSource for BdNotesSource {
    async fn agent_notes(&self, id: &str) -> Result<String> {
        let output = self.run_bd(&["show", id, "--json"]).await?;
        parse_show_output(id, &output)
    }

    async fn agent_ids(&self) -> Result<Vec<String>> {
        let label = format!("--label={}", AGENT_LABEL);
        let output = self.run_bd(&["list", &label, "--json"]).await?;
        let issues: Vec<IssueId> = serde_json::from_slice(&output)
            .map_err(|e| TerminalError::Other(format!("failed to parse bd list output: {}", e)))?;
        Ok(issues.into_iter().map(|issue| issue.id).collect())
    }
}
