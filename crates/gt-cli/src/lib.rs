//! Gas Town terminal CLI library

pub mod session;
pub mod tunnel;

// Re-export CLI types for testing
pub use clap::{Parser, Subcommand};

use anyhow::{Context, Result};
use clap::Args;
use gt_terminal::{
    Backend, BackendResolver, BdNotesSource, CoopBackend, CoopConfig, TmuxBackend, DEFAULT_SESSION,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "gt-term")]
#[command(about = "Inspect and drive agent terminal sessions")]
#[command(version, author, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the agent's recent terminal output
    Peek(session::PeekArgs),
    /// Deliver a message to the agent
    Nudge(session::NudgeArgs),
    /// Send named keys (e.g. Escape Enter) to the agent
    Keys(session::KeysArgs),
    /// Report liveness and the status inferred from output
    Status(session::StatusArgs),
    /// Print the Coop agent state as JSON
    State(session::StateArgs),
    /// Port-forward to an agent pod's Coop sidecar until interrupted
    Tunnel(tunnel::TunnelArgs),
}

/// How agents are reached
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Treat AGENT as a local tmux session name
    #[arg(long, global = true, conflicts_with = "coop_url")]
    pub local: bool,

    /// Talk to this Coop endpoint instead of resolving the agent
    #[arg(long, global = true, value_name = "URL")]
    pub coop_url: Option<String>,

    /// Bearer token for Coop (overridden by a token in agent notes)
    #[arg(long, global = true, env = "GT_COOP_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, value_name = "SECS", default_value_t = 10)]
    pub timeout: u64,

    /// Path to the bd binary used to read agent notes
    #[arg(long, global = true, value_name = "PATH", default_value = "bd")]
    pub bd: PathBuf,

    /// Record prefix for rig-scoped agents
    #[arg(long, global = true, value_name = "PREFIX", default_value = "gt")]
    pub rig_prefix: String,
}

/// A backend plus the session name to address on it
pub struct AgentSession {
    pub backend: Box<dyn Backend>,
    pub session: String,
}

impl ConnectionArgs {
    pub fn coop_config(&self) -> CoopConfig {
        let mut config = CoopConfig::default().with_timeout(Duration::from_secs(self.timeout));
        if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
            config = config.with_token(token);
        }
        config
    }

    pub fn resolver(&self) -> BackendResolver<BdNotesSource> {
        let notes = BdNotesSource::new().with_binary(&self.bd);
        BackendResolver::new(notes)
            .with_config(self.coop_config())
            .with_rig_prefix(&self.rig_prefix)
    }

    /// Coop backend for `agent`, with its session registered as `claude`.
    pub async fn coop(&self, agent: &str) -> Result<CoopBackend> {
        if let Some(url) = &self.coop_url {
            let backend = CoopBackend::new(self.coop_config())?;
            backend.add_session(DEFAULT_SESSION, url);
            return Ok(backend);
        }
        let backend = self
            .resolver()
            .resolve(agent)
            .await
            .with_context(|| format!("resolving backend for {}", agent))?;
        Ok(backend)
    }

    pub async fn connect(&self, agent: &str) -> Result<AgentSession> {
        if self.local {
            let tmux = TmuxBackend::new().with_timeout(Duration::from_secs(self.timeout));
            return Ok(AgentSession {
                backend: Box::new(tmux),
                session: agent.to_string(),
            });
        }
        Ok(AgentSession {
            backend: Box::new(self.coop(agent).await?),
            session: DEFAULT_SESSION.to_string(),
        })
    }
}
