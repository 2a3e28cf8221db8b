//! Session commands: peek, nudge, keys, status, state

use crate::ConnectionArgs;
use anyhow::{bail, Result};
use clap::Args;
use gt_monitoring::{AgentStatus, StatusReport, StatusSource, Tracker};
use gt_terminal::DEFAULT_SESSION;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct PeekArgs {
    /// Agent address (e.g. mayor, gastown/polecats/nux) or tmux session
    #[arg(value_name = "AGENT")]
    pub agent: String,

    /// Number of trailing lines to print (0 = everything)
    #[arg(short = 'n', long, default_value_t = 50)]
    pub lines: usize,
}

#[derive(Args, Debug)]
pub struct NudgeArgs {
    #[arg(value_name = "AGENT")]
    pub agent: String,

    /// Message text; multiple words are joined with spaces
    #[arg(value_name = "MESSAGE", required = true, num_args = 1..)]
    pub message: Vec<String>,
}

#[derive(Args, Debug)]
pub struct KeysArgs {
    #[arg(value_name = "AGENT")]
    pub agent: String,

    /// Key names such as Enter, Escape, C-c
    #[arg(value_name = "KEY", required = true, num_args = 1..)]
    pub keys: Vec<String>,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[arg(value_name = "AGENT")]
    pub agent: String,

    /// Number of trailing lines fed to the classifier
    #[arg(short = 'n', long, default_value_t = 20)]
    pub lines: usize,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct StateArgs {
    #[arg(value_name = "AGENT")]
    pub agent: String,
}

impl PeekArgs {
    pub async fn run(&self, conn: &ConnectionArgs) -> Result<()> {
        let agent = conn.connect(&self.agent).await?;
        let output = agent
            .backend
            .capture_pane(&agent.session, self.lines)
            .await?;
        println!("{}", output);
        Ok(())
    }
}

impl NudgeArgs {
    pub async fn run(&self, conn: &ConnectionArgs) -> Result<()> {
        let agent = conn.connect(&self.agent).await?;
        let message = self.message.join(" ");
        agent
            .backend
            .nudge_session(&agent.session, &message)
            .await?;
        tracing::info!(agent = %self.agent, "nudge delivered");
        Ok(())
    }
}

impl KeysArgs {
    pub async fn run(&self, conn: &ConnectionArgs) -> Result<()> {
        let agent = conn.connect(&self.agent).await?;
        agent
            .backend
            .send_keys(&agent.session, &self.keys.join(" "))
            .await?;
        Ok(())
    }
}

/// Result of `gt-term status`
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusSummary {
    pub agent: String,
    pub alive: bool,
    pub status: AgentStatus,
    pub source: StatusSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusSummary {
    pub fn new(alive: bool, report: StatusReport) -> Self {
        Self {
            agent: report.agent_id,
            alive,
            status: report.status,
            source: report.source,
            message: report.message,
        }
    }
}

/// Feed liveness and captured output into `tracker` and return the agent's
/// effective status.
///
/// No session leaves the agent untracked, so it reads `offline`. A session
/// whose agent process has exited is an `error` (zombie), a blank screen is
/// `available`, and anything else goes to the classifier.
pub fn summarize(
    tracker: &Tracker,
    agent: &str,
    has_session: bool,
    pane_dead: bool,
    output: &str,
) -> StatusReport {
    if has_session {
        tracker.update_activity(agent, output);
        if pane_dead {
            tracker.set_status(agent, AgentStatus::Error, StatusSource::Inferred, None);
        } else if output.trim().is_empty() {
            tracker.set_status(agent, AgentStatus::Available, StatusSource::Inferred, None);
        }
    }
    tracker.get_status(agent)
}

impl StatusArgs {
    pub async fn run(&self, conn: &ConnectionArgs) -> Result<()> {
        let agent = conn.connect(&self.agent).await?;
        let backend = &agent.backend;
        let session = agent.session.as_str();

        let alive = backend.has_session(session).await?;
        let (dead, output) = if alive {
            let dead = backend.is_pane_dead(session).await?;
            (dead, backend.capture_pane(session, self.lines).await?)
        } else {
            (false, String::new())
        };

        let report = summarize(&Tracker::new(), &self.agent, alive, dead, &output);
        let summary = StatusSummary::new(alive && !dead, report);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!("{}: {}", summary.agent, summary.status);
        }
        Ok(())
    }
}

impl StateArgs {
    pub async fn run(&self, conn: &ConnectionArgs) -> Result<()> {
        if conn.local {
            bail!("agent state is only available for coop-backed agents");
        }
        let backend = conn.coop(&self.agent).await?;
        let state = backend.agent_state(DEFAULT_SESSION).await?;
        println!("{}", serde_json::to_string_pretty(&state)?);
        Ok(())
    }
}
