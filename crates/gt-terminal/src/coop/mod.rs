//! Coop HTTP sidecar backend
//!
//! Coop wraps an agent process in a PTY and exposes it over HTTP. One
//! `CoopBackend` can address many Coop instances at once: each session name is
//! bound to the base URL of the instance serving it (a pod IP, a cluster
//! service, or a local port-forward).

pub mod api;
pub mod auth;

pub use api::*;
pub use auth::AuthMethod;

use async_trait::async_trait;
use gt_terminal_core::*;
use parking_lot::RwLock;
use reqwest::{Client as HttpClient, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const BACKEND: &str = "coop";

/// Default timeout for a single Coop request.
pub const DEFAULT_COOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a [`CoopBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoopConfig {
    /// Timeout for each HTTP request; zero means the default.
    pub timeout: Duration,
    /// Optional bearer token for authenticated endpoints.
    pub token: Option<String>,
}

impl Default for CoopConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_COOP_TIMEOUT,
            token: None,
        }
    }
}

impl CoopConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn effective_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_COOP_TIMEOUT
        } else {
            self.timeout
        }
    }
}

/// Session name → Coop base URL.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, String>>,
}

impl SessionRegistry {
    /// Register (or re-point) a session. Trailing slashes are stripped.
    pub fn insert(&self, session: impl Into<String>, base_url: &str) {
        let url = base_url.trim_end_matches('/').to_string();
        self.sessions.write().insert(session.into(), url);
    }

    pub fn remove(&self, session: &str) -> Option<String> {
        self.sessions.write().remove(session)
    }

    pub fn base_url(&self, session: &str) -> Option<String> {
        self.sessions.read().get(session).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Registered session names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Backend talking to one or more Coop sidecars over HTTP
#[derive(Debug)]
pub struct CoopBackend {
    http_client: HttpClient,
    sessions: SessionRegistry,
    auth: AuthMethod,
    timeout: Duration,
}

impl CoopBackend {
    /// Create a backend with no sessions registered.
    pub fn new(config: CoopConfig) -> Result<Self> {
        let timeout = config.effective_timeout();
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .user_agent(concat!("gt-terminal/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TerminalError::Other(format!("building coop http client: {}", e)))?;

        Ok(Self {
            http_client,
            sessions: SessionRegistry::default(),
            auth: AuthMethod::from_token(config.token.as_deref()),
            timeout,
        })
    }

    /// Register a Coop instance for `session` (e.g. "http://localhost:8080").
    pub fn add_session(&self, session: impl Into<String>, base_url: &str) {
        self.sessions.insert(session, base_url);
    }

    /// Unregister a Coop instance.
    pub fn remove_session(&self, session: &str) {
        self.sessions.remove(session);
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn auth(&self) -> &AuthMethod {
        &self.auth
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Base URL for a registered session.
    pub fn base_url(&self, session: &str) -> Result<String> {
        self.sessions
            .base_url(session)
            .ok_or_else(|| TerminalError::not_registered(BACKEND, session))
    }

    /// Type text into the agent's terminal, optionally pressing Enter.
    pub async fn send_input(&self, session: &str, text: &str, enter: bool) -> Result<()> {
        let body = InputRequest {
            text: text.to_string(),
            enter,
        };
        let _: InputResponse = self.post_json(session, INPUT_PATH, &body).await?;
        Ok(())
    }

    /// Check whether the wrapped agent process is still alive.
    pub async fn is_agent_running(&self, session: &str) -> Result<bool> {
        let status: StatusResponse = self.get_json(session, STATUS_PATH).await?;
        Ok(status.state == "running" && status.pid.is_some())
    }

    /// Ask Coop to terminate the agent and shut itself down.
    pub async fn kill_session(&self, session: &str) -> Result<()> {
        let response = self
            .send(Method::POST, session, SHUTDOWN_PATH, None::<&()>)
            .await?;
        ensure_success(response, SHUTDOWN_PATH).await?;
        Ok(())
    }

    pub async fn set_environment(&self, session: &str, key: &str, value: &str) -> Result<()> {
        let path = format!("{}/{}", ENV_PATH, key);
        let body = EnvRequest {
            value: value.to_string(),
        };
        let response = self.send(Method::PUT, session, &path, Some(&body)).await?;
        ensure_success(response, &path).await?;
        Ok(())
    }

    pub async fn get_environment(&self, session: &str, key: &str) -> Result<String> {
        let path = format!("{}/{}", ENV_PATH, key);
        let not_set = || {
            TerminalError::NotFound(format!(
                "coop: environment variable {} not set in session {:?}",
                key, session
            ))
        };

        let response = self.send(Method::GET, session, &path, None::<&()>).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(not_set());
        }
        let response = ensure_ok(response, &path).await?;
        let env: EnvResponse = decode(response, &path).await?;
        env.value.ok_or_else(not_set)
    }

    /// Working directory of the agent process.
    pub async fn get_pane_work_dir(&self, session: &str) -> Result<String> {
        let cwd: CwdResponse = self.get_json(session, CWD_PATH).await?;
        Ok(cwd.cwd)
    }

    /// Restart the agent process in place with the given environment.
    pub async fn switch_session(&self, session: &str, config: &SwitchConfig) -> Result<()> {
        let response = self
            .send(Method::PUT, session, SWITCH_PATH, Some(config))
            .await?;
        ensure_success(response, SWITCH_PATH).await?;
        Ok(())
    }

    /// Restart the agent process with its current configuration.
    pub async fn respawn_pane(&self, session: &str) -> Result<()> {
        self.switch_session(session, &SwitchConfig::default()).await
    }

    /// Current agent state as seen by Coop's detector.
    pub async fn agent_state(&self, session: &str) -> Result<AgentState> {
        self.get_json(session, AGENT_STATE_PATH).await
    }

    /// Answer the prompt currently blocking the agent.
    pub async fn respond_to_prompt(&self, session: &str, request: &RespondRequest) -> Result<()> {
        let response: RespondResponse = self.post_json(session, RESPOND_PATH, request).await?;
        if !response.delivered {
            return Err(TerminalError::not_delivered(
                BACKEND,
                "respond",
                response.reason,
            ));
        }
        Ok(())
    }

    async fn screen_text(&self, session: &str) -> Result<String> {
        let response = self
            .send(Method::GET, session, SCREEN_TEXT_PATH, None::<&()>)
            .await?;
        let response = ensure_ok(response, SCREEN_TEXT_PATH).await?;
        response
            .text()
            .await
            .map_err(|e| TerminalError::request(BACKEND, endpoint_name(SCREEN_TEXT_PATH), e))
    }

    // Private helper methods

    async fn get_json<T: DeserializeOwned>(&self, session: &str, path: &str) -> Result<T> {
        let response = self.send(Method::GET, session, path, None::<&()>).await?;
        let response = ensure_ok(response, path).await?;
        decode(response, path).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        session: &str,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(Method::POST, session, path, Some(body)).await?;
        let response = ensure_ok(response, path).await?;
        decode(response, path).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        session: &str,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url(session)?, path);
        let mut request = self
            .http_client
            .request(method, &url)
            .headers(self.auth.headers()?);
        if let Some(body) = body {
            request = request.json(body);
        }
        request
            .send()
            .await
            .map_err(|e| TerminalError::request(BACKEND, endpoint_name(path), e))
    }
}

/// Short endpoint label used in error messages ("agent/nudge").
fn endpoint_name(path: &str) -> &str {
    path.strip_prefix("/api/v1/").unwrap_or(path)
}

async fn status_error(response: Response, path: &str) -> TerminalError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    TerminalError::Status {
        backend: BACKEND,
        endpoint: endpoint_name(path).to_string(),
        status,
        body: body.trim().to_string(),
    }
}

async fn ensure_ok(response: Response, path: &str) -> Result<Response> {
    if response.status() == StatusCode::OK {
        Ok(response)
    } else {
        Err(status_error(response, path).await)
    }
}

async fn ensure_success(response: Response, path: &str) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(status_error(response, path).await)
    }
}

async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> Result<T> {
    let text = response
        .text()
        .await
        .map_err(|e| TerminalError::request(BACKEND, endpoint_name(path), e))?;
    serde_json::from_str(&text).map_err(|e| TerminalError::decode(BACKEND, endpoint_name(path), e))
}

#[async_trait]
impl Backend for CoopBackend {
    fn id(&self) -> &'static str {
        BACKEND
    }

    async fn has_session(&self, session: &str) -> Result<bool> {
        let response = match self
            .send(Method::GET, session, HEALTH_PATH, None::<&()>)
            .await
        {
            Ok(response) => response,
            Err(e @ (TerminalError::NotRegistered { .. } | TerminalError::Request { .. })) => {
                debug!(session, "coop session not reachable: {}", e);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        if response.status() != StatusCode::OK {
            debug!(session, status = %response.status(), "coop health not ok");
            return Ok(false);
        }

        let health: HealthResponse = decode(response, HEALTH_PATH).await?;
        Ok(health.is_running())
    }

    async fn capture_pane(&self, session: &str, lines: usize) -> Result<String> {
        let text = self.screen_text(session).await?;
        Ok(tail_lines(&text, lines))
    }

    async fn capture_pane_all(&self, session: &str) -> Result<String> {
        self.screen_text(session).await
    }

    async fn nudge_session(&self, session: &str, message: &str) -> Result<()> {
        let body = NudgeRequest {
            message: message.to_string(),
        };
        let response: NudgeResponse = self.post_json(session, NUDGE_PATH, &body).await?;
        if !response.delivered {
            return Err(TerminalError::not_delivered(BACKEND, "nudge", response.reason));
        }
        Ok(())
    }

    async fn send_keys(&self, session: &str, keys: &str) -> Result<()> {
        let names = key_names(keys);
        if names.is_empty() {
            return Ok(());
        }
        let body = KeysRequest {
            keys: names.into_iter().map(str::to_string).collect(),
        };
        // The reply body is not needed, only the status.
        let response = self
            .send(Method::POST, session, KEYS_PATH, Some(&body))
            .await?;
        ensure_ok(response, KEYS_PATH).await?;
        Ok(())
    }

    async fn is_pane_dead(&self, session: &str) -> Result<bool> {
        Ok(self.agent_state(session).await?.is_dead())
    }

    async fn set_pane_died_hook(&self, _session: &str, _agent_id: &str) -> Result<()> {
        // Coop supervises the agent process itself.
        Ok(())
    }
}
