//! Session backends for agent terminals
//!
//! - [`tmux::TmuxBackend`] drives agents running in local tmux sessions.
//! - [`coop::CoopBackend`] drives agents wrapped by the Coop HTTP sidecar.
//! - [`tunnel::PodTunnel`] makes a Coop sidecar inside a pod reachable locally.
//! - [`resolve::BackendResolver`] picks the Coop endpoint for an agent from its
//!   metadata notes.

pub mod coop;
pub mod notes;
pub mod port;
pub mod resolve;
#[cfg(feature = "tmux")]
pub mod tmux;
pub mod tunnel;

pub use coop::{CoopBackend, CoopConfig};
pub use gt_terminal_core::{Backend, Result, TerminalError};
pub use notes::{BdNotesSource, NotesSource};
pub use resolve::{AgentPodInfo, BackendResolver, CoopResolvedConfig, DEFAULT_SESSION};
#[cfg(feature = "tmux")]
pub use tmux::TmuxBackend;
pub use tunnel::{PodTunnel, PodTunnelConfig};
