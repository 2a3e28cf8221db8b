//! Backend resolution from agent metadata notes
//!
//! Every agent record may carry notes such as:
//!
//! ```text
//! backend: coop
//! coop_url: http://10.0.3.7:8080
//! coop_token: s3cret
//! pod_name: gt-gastown-polecat-nux
//! pod_namespace: gastown
//! ```
//!
//! [`BackendResolver`] turns an agent address into a [`CoopBackend`] with one
//! session registered, or into the pod coordinates needed to open a tunnel.

use crate::coop::{CoopBackend, CoopConfig};
use crate::notes::NotesSource;
use gt_terminal_core::{Result, TerminalError};
use serde::Serialize;
use tracing::debug;

/// Session name used for the single session of a resolved Coop agent.
pub const DEFAULT_SESSION: &str = "claude";

/// Bead prefix used when a rig has no configured prefix.
pub const DEFAULT_RIG_PREFIX: &str = "gt";

/// Town-level agents whose records always live under `hq-`.
const TOWN_AGENTS: [&str; 3] = ["mayor", "deacon", "boot"];

/// Coop connection details parsed from agent notes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoopResolvedConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub backend: Option<String>,
    pub pod_name: Option<String>,
    pub pod_namespace: Option<String>,
}

/// Kubernetes pod coordinates of an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentPodInfo {
    pub pod_name: String,
    pub namespace: Option<String>,
    pub coop_url: String,
}

/// No path separator and no hyphen: a short name like `mayor` or `nux`.
fn is_bare(agent_id: &str) -> bool {
    !agent_id.contains('/') && !agent_id.contains('-')
}

/// Record ids to try for an agent id, in order.
pub fn candidates(agent_id: &str) -> Vec<String> {
    let mut ids = vec![agent_id.to_string()];
    if is_bare(agent_id) {
        ids.push(format!("hq-{}", agent_id));
    }
    ids
}

/// Agent record id for a rig-scoped role. The rig is left out when it equals
/// the prefix (`fhc-polecat-nux`, not `fhc-fhc-polecat-nux`).
pub fn agent_bead_id(prefix: &str, rig: &str, role: &str, name: Option<&str>) -> String {
    let mut id = if prefix == rig {
        format!("{}-{}", prefix, role)
    } else {
        format!("{}-{}-{}", prefix, rig, role)
    };
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        id.push('-');
        id.push_str(name);
    }
    id
}

/// Record ids implied by a path address (`rig/name` or `rig/type/name`).
pub fn path_candidates(prefix: &str, address: &str) -> Vec<String> {
    let parts: Vec<&str> = address.split('/').collect();
    match parts[..] {
        [rig, name] if !rig.is_empty() && !name.is_empty() => vec![
            agent_bead_id(prefix, rig, name, None),
            agent_bead_id(prefix, rig, "polecat", Some(name)),
            agent_bead_id(prefix, rig, "crew", Some(name)),
        ],
        [rig, kind, name] if !rig.is_empty() && !name.is_empty() => {
            let role = match kind {
                "polecats" => "polecat",
                other => other,
            };
            vec![agent_bead_id(prefix, rig, role, Some(name))]
        }
        _ => Vec::new(),
    }
}

/// Parse Coop settings out of agent notes.
///
/// Notes that are empty or never mention coop describe a non-Coop agent and
/// yield `Ok(None)`. Lines are `key: value`; the value keeps any further
/// colons, unknown keys and colon-less lines are skipped and the last
/// duplicate wins.
pub fn parse_coop_config(notes: &str) -> Result<Option<CoopResolvedConfig>> {
    let notes = notes.trim();
    if notes.is_empty() || !notes.contains("coop") {
        return Ok(None);
    }

    let mut cfg = CoopResolvedConfig::default();
    for line in notes.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "coop_url" => cfg.base_url = value,
            "coop_token" => cfg.token = Some(value).filter(|v| !v.is_empty()),
            "backend" => cfg.backend = Some(value),
            "pod_name" => cfg.pod_name = Some(value).filter(|v| !v.is_empty()),
            "pod_namespace" => cfg.pod_namespace = Some(value).filter(|v| !v.is_empty()),
            _ => {}
        }
    }

    if cfg.base_url.is_empty() {
        return Err(TerminalError::MissingConfig(
            "coop agent missing coop_url in bead metadata".to_string(),
        ));
    }
    Ok(Some(cfg))
}

/// Picks and configures a backend per agent
pub struct BackendResolver<N> {
    notes: N,
    config: CoopConfig,
    rig_prefix: String,
}

impl<N: NotesSource> BackendResolver<N> {
    pub fn new(notes: N) -> Self {
        Self {
            notes,
            config: CoopConfig::default(),
            rig_prefix: DEFAULT_RIG_PREFIX.to_string(),
        }
    }

    /// Base configuration for resolved backends. A token in the notes
    /// overrides the one given here.
    pub fn with_config(mut self, config: CoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_rig_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.rig_prefix = prefix.into();
        self
    }

    pub fn notes(&self) -> &N {
        &self.notes
    }

    /// Build a backend for `agent_id`.
    ///
    /// When no record describes a Coop agent the backend has no sessions, and
    /// every session operation on it reports the session as unregistered.
    pub async fn resolve(&self, agent_id: &str) -> Result<CoopBackend> {
        let mut ids = candidates(agent_id);
        if agent_id.contains('/') {
            ids.extend(path_candidates(&self.rig_prefix, agent_id));
        }

        for id in &ids {
            if let Some(cfg) = self.lookup(id).await {
                debug!(agent = agent_id, record = %id, url = %cfg.base_url, "resolved coop backend");
                return self.backend_for(cfg);
            }
        }

        if is_bare(agent_id) {
            if let Some(id) = self.find_by_name(agent_id).await {
                if let Some(cfg) = self.lookup(&id).await {
                    debug!(agent = agent_id, record = %id, "resolved coop backend by name");
                    return self.backend_for(cfg);
                }
            }
        }

        debug!(agent = agent_id, "no coop metadata, returning empty backend");
        CoopBackend::new(self.config.clone())
    }

    /// Pod coordinates for an agent address (`mayor`, `hq-mayor`,
    /// `gastown/polecats/nux`, `nux`).
    pub async fn resolve_pod_info(&self, address: &str) -> Result<AgentPodInfo> {
        let ids = if TOWN_AGENTS.contains(&address) {
            vec![format!("hq-{}", address)]
        } else {
            let mut ids = candidates(address);
            if address.contains('/') {
                ids.extend(path_candidates(&self.rig_prefix, address));
            }
            ids
        };

        for id in &ids {
            if let Some(info) = self.lookup(id).await.and_then(pod_info) {
                return Ok(info);
            }
        }

        if is_bare(address) && !TOWN_AGENTS.contains(&address) {
            if let Some(id) = self.find_by_name(address).await {
                if let Some(info) = self.lookup(&id).await.and_then(pod_info) {
                    return Ok(info);
                }
            }
        }

        Err(TerminalError::NotFound(format!(
            "no pod metadata found for agent {:?}",
            address
        )))
    }

    fn backend_for(&self, cfg: CoopResolvedConfig) -> Result<CoopBackend> {
        let mut config = self.config.clone();
        if let Some(token) = cfg.token {
            config.token = Some(token);
        }
        let backend = CoopBackend::new(config)?;
        backend.add_session(DEFAULT_SESSION, &cfg.base_url);
        Ok(backend)
    }

    async fn lookup(&self, id: &str) -> Option<CoopResolvedConfig> {
        let notes = match self.notes.agent_notes(id).await {
            Ok(notes) => notes,
            Err(e) => {
                debug!(record = id, "agent notes lookup failed: {}", e);
                return None;
            }
        };
        match parse_coop_config(&notes) {
            Ok(cfg) => cfg,
            Err(e) => {
                debug!(record = id, "skipping agent notes: {}", e);
                None
            }
        }
    }

    /// First agent record named `<...>-polecat-<name>` or `<...>-crew-<name>`.
    async fn find_by_name(&self, name: &str) -> Option<String> {
        let ids = match self.notes.agent_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                debug!("listing agent records failed: {}", e);
                return None;
            }
        };
        let polecat = format!("-polecat-{}", name);
        let crew = format!("-crew-{}", name);
        ids.into_iter()
            .find(|id| id.ends_with(&polecat) || id.ends_with(&crew))
    }
}

fn pod_info(cfg: CoopResolvedConfig) -> Option<AgentPodInfo> {
    let pod_name = cfg.pod_name?;
    Some(AgentPodInfo {
        pod_name,
        namespace: cfg.pod_namespace,
        coop_url: cfg.base_url,
    })
}
