//! Request and response bodies of the Coop HTTP API.
//!
//! Only the endpoints this crate calls are modelled. Unknown fields are
//! ignored on decode so newer Coop versions stay compatible.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const HEALTH_PATH: &str = "/api/v1/health";
pub const STATUS_PATH: &str = "/api/v1/status";
pub const SCREEN_TEXT_PATH: &str = "/api/v1/screen/text";
pub const NUDGE_PATH: &str = "/api/v1/agent/nudge";
pub const INPUT_PATH: &str = "/api/v1/input";
pub const KEYS_PATH: &str = "/api/v1/input/keys";
pub const AGENT_STATE_PATH: &str = "/api/v1/agent/state";
pub const RESPOND_PATH: &str = "/api/v1/agent/respond";
pub const SHUTDOWN_PATH: &str = "/api/v1/shutdown";
pub const ENV_PATH: &str = "/api/v1/env";
pub const CWD_PATH: &str = "/api/v1/session/cwd";
pub const SWITCH_PATH: &str = "/api/v1/session/switch";

/// `GET /api/v1/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub pid: Option<i32>,
    #[serde(default)]
    pub ready: bool,
}

impl HealthResponse {
    /// A session counts as running only once the child process has a pid.
    pub fn is_running(&self) -> bool {
        self.status == "running" && self.pid.is_some()
    }
}

/// `GET /api/v1/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub state: String,
    pub pid: Option<i32>,
    #[serde(default)]
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NudgeRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NudgeResponse {
    pub delivered: bool,
    #[serde(default)]
    pub state_before: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputRequest {
    pub text: String,
    pub enter: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysRequest {
    pub keys: Vec<String>,
}

/// Reply of the input endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputResponse {
    #[serde(default)]
    pub bytes_written: u64,
}

/// Structured agent state reported by Coop's detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub agent: String,
    pub state: String,
    #[serde(default)]
    pub since_seq: u64,
    #[serde(default)]
    pub screen_seq: u64,
    #[serde(default)]
    pub detection_tier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<PromptContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<String>,
}

impl AgentState {
    /// The agent process is gone (clean exit or crash).
    pub fn is_dead(&self) -> bool {
        matches!(self.state.as_str(), "exited" | "crashed")
    }
}

/// An interactive prompt currently blocking the agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptContext {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub prompt_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Answer to an agent prompt. Set exactly the field the prompt asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespondRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl RespondRequest {
    pub fn accept(accept: bool) -> Self {
        Self {
            accept: Some(accept),
            ..Self::default()
        }
    }

    pub fn option(option: u32) -> Self {
        Self {
            option: Some(option),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondResponse {
    pub delivered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvRequest {
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvResponse {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CwdResponse {
    pub cwd: String,
}

/// Options for restarting the agent process inside an existing session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchConfig {
    /// Environment applied to the respawned process.
    #[serde(
        rename = "credentials",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub extra_env: BTreeMap<String, String>,
    /// Switch even when the agent is mid-turn.
    #[serde(default)]
    pub force: bool,
}

impl SwitchConfig {
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env.insert(key.into(), value.into());
        self
    }
}
