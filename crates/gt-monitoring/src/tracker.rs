//! Per-agent status tracking
//!
//! [`Tracker`] keeps the latest override, self-report and observed activity
//! for every agent and resolves them into one [`StatusReport`]: a boss
//! override beats a self-report, which beats inference.

use crate::detector::PatternRegistry;
use crate::idle::{IdleDetector, IdleLevel};
use crate::types::{AgentStatus, StatusReport, StatusSource};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct AgentState {
    boss_override: Option<StatusReport>,
    self_reported: Option<StatusReport>,
    last_activity: Option<DateTime<Utc>>,
    last_output: String,
    pattern_status: Option<AgentStatus>,
}

/// Thread-safe status tracker for a set of agents
#[derive(Debug, Default)]
pub struct Tracker {
    agents: RwLock<HashMap<String, AgentState>>,
    patterns: PatternRegistry,
    idle: IdleDetector,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patterns(mut self, patterns: PatternRegistry) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_idle_detector(mut self, idle: IdleDetector) -> Self {
        self.idle = idle;
        self
    }

    /// Record fresh output from an agent.
    pub fn update_activity(&self, agent_id: &str, output: &str) {
        self.update_activity_at(agent_id, output, Utc::now());
    }

    /// Record output observed at `at`. Output the classifier has no opinion
    /// on keeps the previously detected status.
    pub fn update_activity_at(&self, agent_id: &str, output: &str, at: DateTime<Utc>) {
        let detected = self.patterns.detect(output);
        let mut agents = self.agents.write();
        let state = agents.entry(agent_id.to_string()).or_default();
        state.last_activity = Some(at);
        state.last_output = output.to_string();
        if detected.is_some() {
            state.pattern_status = detected;
        }
    }

    /// Set a status from `source`. An inferred status replaces the detected
    /// one and carries no message.
    pub fn set_status(
        &self,
        agent_id: &str,
        status: AgentStatus,
        source: StatusSource,
        message: Option<String>,
    ) {
        let mut agents = self.agents.write();
        let state = agents.entry(agent_id.to_string()).or_default();

        let mut report = StatusReport::new(agent_id, status, source);
        report.message = message;
        report.last_activity = state.last_activity;

        match source {
            StatusSource::BossOverride => state.boss_override = Some(report),
            StatusSource::SelfReported => state.self_reported = Some(report),
            StatusSource::Inferred => state.pattern_status = Some(status),
        }
    }

    /// Effective status of an agent. Unknown agents are `offline`.
    pub fn get_status(&self, agent_id: &str) -> StatusReport {
        match self.agents.read().get(agent_id) {
            Some(state) => self.resolve(agent_id, state),
            None => StatusReport::new(agent_id, AgentStatus::Offline, StatusSource::Inferred),
        }
    }

    /// Effective status of every tracked agent, ordered by agent id.
    pub fn all_statuses(&self) -> Vec<StatusReport> {
        let agents = self.agents.read();
        let mut reports: Vec<StatusReport> = agents
            .iter()
            .map(|(agent_id, state)| self.resolve(agent_id, state))
            .collect();
        reports.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        reports
    }

    /// Most recent output recorded for an agent.
    pub fn last_output(&self, agent_id: &str) -> Option<String> {
        self.agents
            .read()
            .get(agent_id)
            .map(|state| state.last_output.clone())
    }

    /// Drop the boss override, falling back to the self-report or inference.
    pub fn clear_override(&self, agent_id: &str) {
        if let Some(state) = self.agents.write().get_mut(agent_id) {
            state.boss_override = None;
        }
    }

    pub fn remove_agent(&self, agent_id: &str) {
        self.agents.write().remove(agent_id);
    }

    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }

    fn resolve(&self, agent_id: &str, state: &AgentState) -> StatusReport {
        let explicit = state
            .boss_override
            .as_ref()
            .or(state.self_reported.as_ref());
        if let Some(report) = explicit {
            let mut report = report.clone();
            report.last_activity = state.last_activity;
            return report;
        }
        self.infer(agent_id, state)
    }

    fn infer(&self, agent_id: &str, state: &AgentState) -> StatusReport {
        let level = self.idle.classify(state.last_activity);
        let mut report = match level {
            IdleLevel::Active => StatusReport::new(
                agent_id,
                state.pattern_status.unwrap_or(AgentStatus::Working),
                StatusSource::Inferred,
            ),
            _ => {
                let mut report = StatusReport::new(
                    agent_id,
                    self.idle.infer_status(state.last_activity),
                    StatusSource::Inferred,
                );
                report.message = Some(format!("idle level: {}", level));
                report
            }
        };
        if let Some(at) = state.last_activity {
            report.since = at;
        }
        report.last_activity = state.last_activity;
        report
    }
}
