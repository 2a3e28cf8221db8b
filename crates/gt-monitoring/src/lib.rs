//! Agent status tracking and inference
//!
//! A status comes from one of three sources, in priority order: an explicit
//! override by a supervising agent, a report from the agent itself, or
//! inference from terminal output ([`PatternRegistry`]) and activity
//! timestamps ([`IdleDetector`]). [`Tracker`] applies that order per agent.

pub mod detector;
pub mod idle;
pub mod tracker;
pub mod types;

pub use detector::{Pattern, PatternRegistry};
pub use idle::{IdleDetector, IdleLevel};
pub use tracker::Tracker;
pub use types::{AgentStatus, StatusReport, StatusSource};
