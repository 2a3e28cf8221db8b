//! Agent status vocabulary

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operational status of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Ready for work assignment
    Available,
    /// Actively executing a task
    Working,
    /// Processing or reasoning
    Thinking,
    /// Waiting on an external dependency
    Blocked,
    /// Waiting for human input or a decision
    Waiting,
    /// Reviewing code or output
    Reviewing,
    /// No activity for an extended period
    Idle,
    /// Manually paused by an operator
    Paused,
    /// Needs intervention
    Error,
    /// Session not running
    Offline,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Available => "available",
            AgentStatus::Working => "working",
            AgentStatus::Thinking => "thinking",
            AgentStatus::Blocked => "blocked",
            AgentStatus::Waiting => "waiting",
            AgentStatus::Reviewing => "reviewing",
            AgentStatus::Idle => "idle",
            AgentStatus::Paused => "paused",
            AgentStatus::Error => "error",
            AgentStatus::Offline => "offline",
        }
    }

    /// Normal operation.
    pub fn is_healthy(&self) -> bool {
        matches!(
            self,
            AgentStatus::Available
                | AgentStatus::Working
                | AgentStatus::Thinking
                | AgentStatus::Reviewing
        )
    }

    /// May require operator intervention.
    pub fn needs_attention(&self) -> bool {
        matches!(
            self,
            AgentStatus::Blocked | AgentStatus::Error | AgentStatus::Idle
        )
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a status was determined, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusSource {
    /// Set explicitly by a supervising agent
    #[serde(rename = "boss")]
    BossOverride,
    /// Reported by the agent itself
    #[serde(rename = "self")]
    SelfReported,
    /// Detected from activity timestamps and output
    #[serde(rename = "inferred")]
    Inferred,
}

/// Point-in-time status of one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub agent_id: String,
    pub status: AgentStatus,
    pub source: StatusSource,
    pub since: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
}

impl StatusReport {
    pub fn new(agent_id: impl Into<String>, status: AgentStatus, source: StatusSource) -> Self {
        Self {
            agent_id: agent_id.into(),
            status,
            source,
            since: Utc::now(),
            message: None,
            last_activity: None,
        }
    }

    /// Time spent in this status so far; zero for a `since` in the future.
    pub fn duration(&self) -> Duration {
        (Utc::now() - self.since).max(Duration::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_and_attention() {
        assert!(AgentStatus::Working.is_healthy());
        assert!(AgentStatus::Reviewing.is_healthy());
        assert!(!AgentStatus::Blocked.is_healthy());
        assert!(!AgentStatus::Offline.is_healthy());

        assert!(AgentStatus::Idle.needs_attention());
        assert!(AgentStatus::Error.needs_attention());
        assert!(!AgentStatus::Waiting.needs_attention());
        assert!(!AgentStatus::Paused.needs_attention());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&AgentStatus::Reviewing).unwrap(),
            "\"reviewing\""
        );
        let status: AgentStatus = serde_json::from_str("\"offline\"").unwrap();
        assert_eq!(status, AgentStatus::Offline);
        assert_eq!(AgentStatus::Thinking.to_string(), "thinking");
    }

    #[test]
    fn test_status_source_priority() {
        assert!(StatusSource::BossOverride < StatusSource::SelfReported);
        assert!(StatusSource::SelfReported < StatusSource::Inferred);
        assert_eq!(
            serde_json::to_string(&StatusSource::SelfReported).unwrap(),
            "\"self\""
        );
    }

    #[test]
    fn test_report_duration_never_negative() {
        let mut report = StatusReport::new("gastown/witness", AgentStatus::Working, StatusSource::Inferred);
        report.since = Utc::now() + Duration::minutes(5);
        assert_eq!(report.duration(), Duration::zero());

        report.since = Utc::now() - Duration::minutes(5);
        assert!(report.duration() >= Duration::minutes(5));
    }
}
