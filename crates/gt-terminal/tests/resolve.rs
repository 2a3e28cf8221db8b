mod support;

use async_trait::async_trait;
use gt_terminal::{
    Backend, BackendResolver, CoopConfig, NotesSource, Result, TerminalError, DEFAULT_SESSION,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use support::MockCoop;

/// Notes keyed by record id; records every lookup.
#[derive(Default)]
struct FakeNotes {
    notes: HashMap<String, String>,
    broken: Vec<String>,
    ids: Vec<String>,
    lookups: Mutex<Vec<String>>,
}

impl FakeNotes {
    fn with(mut self, id: &str, notes: &str) -> Self {
        self.notes.insert(id.to_string(), notes.to_string());
        self.ids.push(id.to_string());
        self
    }

    fn failing(mut self, id: &str) -> Self {
        self.broken.push(id.to_string());
        self
    }

    fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotesSource for FakeNotes {
    async fn agent_notes(&self, id: &str) -> Result<String> {
        self.lookups.lock().unwrap().push(id.to_string());
        if self.broken.iter().any(|b| b == id) {
            return Err(TerminalError::CommandFailed("bd show failed: boom".into()));
        }
        self.notes
            .get(id)
            .cloned()
            .ok_or_else(|| TerminalError::NotFound(format!("agent bead {id:?} not found")))
    }

    async fn agent_ids(&self) -> Result<Vec<String>> {
        Ok(self.ids.clone())
    }
}

#[tokio::test]
async fn resolves_town_agent_through_hq_prefix() {
    let notes = FakeNotes::default().with(
        "hq-mayor",
        "backend: coop\ncoop_url: http://10.0.0.5:8080/",
    );
    let resolver = BackendResolver::new(notes);

    let backend = resolver.resolve("mayor").await.unwrap();
    assert_eq!(
        backend.base_url(DEFAULT_SESSION).unwrap(),
        "http://10.0.0.5:8080"
    );
    assert_eq!(resolver.notes().lookups(), vec!["mayor", "hq-mayor"]);
}

#[tokio::test]
async fn lookup_errors_fall_through_to_next_candidate() {
    let notes = FakeNotes::default()
        .failing("deacon")
        .with("hq-deacon", "coop_url: http://deacon:8080");
    let resolver = BackendResolver::new(notes);

    let backend = resolver.resolve("deacon").await.unwrap();
    assert_eq!(
        backend.base_url(DEFAULT_SESSION).unwrap(),
        "http://deacon:8080"
    );
}

#[tokio::test]
async fn malformed_notes_fall_through() {
    let notes = FakeNotes::default()
        .with("boot", "backend: coop")
        .with("hq-boot", "coop_url: http://boot:8080");
    let resolver = BackendResolver::new(notes);

    let backend = resolver.resolve("boot").await.unwrap();
    assert_eq!(backend.base_url(DEFAULT_SESSION).unwrap(), "http://boot:8080");
}

#[tokio::test]
async fn unknown_agent_gets_empty_backend() {
    let resolver = BackendResolver::new(FakeNotes::default());

    let backend = resolver.resolve("rig/ghost").await.unwrap();
    assert!(backend.sessions().is_empty());
    assert!(!backend.has_session(DEFAULT_SESSION).await.unwrap());
    assert!(backend
        .capture_pane(DEFAULT_SESSION, 10)
        .await
        .unwrap_err()
        .is_not_registered());
}

#[tokio::test]
async fn rig_path_uses_prefixed_record_ids() {
    let notes = FakeNotes::default().with(
        "gt-gastown-polecat-nux",
        "backend: coop\ncoop_url: http://nux:8080",
    );
    let resolver = BackendResolver::new(notes);

    let backend = resolver.resolve("gastown/polecats/nux").await.unwrap();
    assert_eq!(backend.base_url(DEFAULT_SESSION).unwrap(), "http://nux:8080");
}

#[tokio::test]
async fn bare_name_found_by_suffix() {
    let notes = FakeNotes::default()
        .with("gt-gastown-witness", "backend: tmux")
        .with("gt-gastown-crew-max", "coop_url: http://max:8080");
    let resolver = BackendResolver::new(notes);

    let backend = resolver.resolve("max").await.unwrap();
    assert_eq!(backend.base_url(DEFAULT_SESSION).unwrap(), "http://max:8080");
}

#[tokio::test]
async fn notes_token_overrides_base_config() {
    let mock = MockCoop::start().await;
    mock.json("POST", "/api/v1/agent/nudge", 200, json!({"delivered": true}));

    let notes = FakeNotes::default().with(
        "hq-mayor",
        &format!("backend: coop\ncoop_url: {}\ncoop_token: from-notes", mock.base_url),
    );
    let resolver =
        BackendResolver::new(notes).with_config(CoopConfig::default().with_token("from-config"));

    let backend = resolver.resolve("hq-mayor").await.unwrap();
    backend.nudge_session(DEFAULT_SESSION, "wake up").await.unwrap();

    assert_eq!(
        mock.requests()[0].authorization.as_deref(),
        Some("Bearer from-notes")
    );
}

#[tokio::test]
async fn pod_info_for_town_agent() {
    let notes = FakeNotes::default().with(
        "hq-mayor",
        "backend: coop\ncoop_url: http://10.0.0.5:8080\npod_name: hq-mayor-0\npod_namespace: gastown",
    );
    let resolver = BackendResolver::new(notes);

    let info = resolver.resolve_pod_info("mayor").await.unwrap();
    assert_eq!(info.pod_name, "hq-mayor-0");
    assert_eq!(info.namespace.as_deref(), Some("gastown"));
    assert_eq!(info.coop_url, "http://10.0.0.5:8080");
    assert_eq!(resolver.notes().lookups(), vec!["hq-mayor"]);
}

#[tokio::test]
async fn pod_info_requires_pod_name() {
    let notes = FakeNotes::default().with("hq-deacon", "coop_url: http://deacon:8080");
    let resolver = BackendResolver::new(notes);

    let err = resolver.resolve_pod_info("deacon").await.unwrap_err();
    assert_eq!(err.to_string(), "no pod metadata found for agent \"deacon\"");
}

#[tokio::test]
async fn pod_info_for_rig_role() {
    let notes = FakeNotes::default().with(
        "gt-gastown-witness",
        "coop_url: http://w:8080\npod_name: gt-gastown-witness-0",
    );
    let resolver = BackendResolver::new(notes);

    let info = resolver.resolve_pod_info("gastown/witness").await.unwrap();
    assert_eq!(info.pod_name, "gt-gastown-witness-0");
    assert_eq!(info.namespace, None);
}
