//! Idle detection from activity timestamps

use crate::types::AgentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(2 * 60);
pub const DEFAULT_STALE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_STUCK_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// How long an agent has gone without activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdleLevel {
    Active,
    Idle,
    Stale,
    Stuck,
}

impl fmt::Display for IdleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IdleLevel::Active => "active",
            IdleLevel::Idle => "idle",
            IdleLevel::Stale => "stale",
            IdleLevel::Stuck => "stuck",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleDetector {
    idle_timeout: Duration,
    stale_timeout: Duration,
    stuck_timeout: Duration,
}

impl Default for IdleDetector {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            stale_timeout: DEFAULT_STALE_TIMEOUT,
            stuck_timeout: DEFAULT_STUCK_TIMEOUT,
        }
    }
}

impl IdleDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_stale_timeout(mut self, timeout: Duration) -> Self {
        self.stale_timeout = timeout;
        self
    }

    pub fn with_stuck_timeout(mut self, timeout: Duration) -> Self {
        self.stuck_timeout = timeout;
        self
    }

    /// Idle level at the current time.
    pub fn classify(&self, last_activity: Option<DateTime<Utc>>) -> IdleLevel {
        self.classify_at(last_activity, Utc::now())
    }

    /// Idle level at `now`. No activity at all counts as stuck; a timestamp
    /// in the future (clock skew) counts as active.
    pub fn classify_at(&self, last_activity: Option<DateTime<Utc>>, now: DateTime<Utc>) -> IdleLevel {
        let Some(last_activity) = last_activity else {
            return IdleLevel::Stuck;
        };
        let Ok(elapsed) = (now - last_activity).to_std() else {
            return IdleLevel::Active;
        };

        if elapsed >= self.stuck_timeout {
            IdleLevel::Stuck
        } else if elapsed >= self.stale_timeout {
            IdleLevel::Stale
        } else if elapsed >= self.idle_timeout {
            IdleLevel::Idle
        } else {
            IdleLevel::Active
        }
    }

    pub fn infer_status(&self, last_activity: Option<DateTime<Utc>>) -> AgentStatus {
        status_for(self.classify(last_activity))
    }
}

/// Status implied by an idle level.
pub fn status_for(level: IdleLevel) -> AgentStatus {
    match level {
        IdleLevel::Active => AgentStatus::Working,
        IdleLevel::Idle | IdleLevel::Stale => AgentStatus::Idle,
        IdleLevel::Stuck => AgentStatus::Error,
    }
}
