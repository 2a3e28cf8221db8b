//! Status detection from captured terminal output

use crate::types::AgentStatus;
use regex::Regex;

/// Output pattern mapped to the status it indicates
#[derive(Debug, Clone)]
pub struct Pattern {
    pub regex: Regex,
    pub status: AgentStatus,
}

impl Pattern {
    pub fn new(pattern: &str, status: AgentStatus) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            status,
        })
    }
}

/// Ordered pattern list; the first match wins.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    patterns: Vec<Pattern>,
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self {
            patterns: default_patterns(),
        }
    }
}

impl PatternRegistry {
    /// Registry with the built-in patterns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with no patterns: every non-empty output is `Working`.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Classify `output`. Empty output has no status; output that matches no
    /// pattern means the agent is working.
    pub fn detect(&self, output: &str) -> Option<AgentStatus> {
        let output = output.trim();
        if output.is_empty() {
            return None;
        }
        let status = self
            .patterns
            .iter()
            .find(|p| p.regex.is_match(output))
            .map(|p| p.status)
            .unwrap_or(AgentStatus::Working);
        Some(status)
    }

    /// Append a custom pattern, checked after all existing ones.
    pub fn add_pattern(&mut self, pattern: &str, status: AgentStatus) -> Result<(), regex::Error> {
        self.patterns.push(Pattern::new(pattern, status)?);
        Ok(())
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

// More specific patterns come first.
const DEFAULT_PATTERNS: &[(&str, AgentStatus)] = &[
    (
        r"(?i)(?:^|\s)(?:error|fatal|panic|crash|segfault)(?:\s|:|$)",
        AgentStatus::Error,
    ),
    (r"(?i)hook error", AgentStatus::Error),
    (r"(?i)(?:^|\s)BLOCKED:", AgentStatus::Blocked),
    (
        r"(?i)waiting for (?:approval|review|merge|response)",
        AgentStatus::Blocked,
    ),
    (r"(?i)blocked by", AgentStatus::Blocked),
    (
        r"(?i)waiting for (?:human|user|input|decision)",
        AgentStatus::Waiting,
    ),
    (r"(?i)decision point", AgentStatus::Waiting),
    (r"(?i)awaiting (?:response|feedback)", AgentStatus::Waiting),
    (r"(?i)(?:^|\s)thinking\.{3}", AgentStatus::Thinking),
    (r"(?i)analyzing|processing|computing", AgentStatus::Thinking),
    (
        r"(?i)reviewing (?:code|changes|PR|pull request|diff)",
        AgentStatus::Reviewing,
    ),
    (r"(?i)code review", AgentStatus::Reviewing),
];

fn default_patterns() -> Vec<Pattern> {
    DEFAULT_PATTERNS
        .iter()
        .map(|(pattern, status)| {
            Pattern::new(pattern, *status).expect("built-in status pattern must compile")
        })
        .collect()
}
