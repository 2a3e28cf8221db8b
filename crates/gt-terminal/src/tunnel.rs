//! kubectl port-forward tunnel to a Coop sidecar running in a pod
//!
//! A [`PodTunnel`] owns one `kubectl port-forward` subprocess and the local
//! port it listens on. `open` only returns once Coop answers its health check
//! through the tunnel, so callers can register the local URL right away.

use crate::coop::{HealthResponse, HEALTH_PATH};
use crate::port::free_port;
use gt_terminal_core::{Result, TerminalError};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Port Coop listens on inside the pod.
pub const DEFAULT_COOP_PORT: u16 = 8080;

pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const STDERR_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodTunnelConfig {
    pub pod_name: String,
    /// Omitted from the kubectl invocation when `None`.
    pub namespace: Option<String>,
    pub remote_port: u16,
    pub kubeconfig: Option<PathBuf>,
    pub kubectl: PathBuf,
    pub health_timeout: Duration,
    pub poll_interval: Duration,
}

impl PodTunnelConfig {
    pub fn new(pod_name: impl Into<String>) -> Self {
        Self {
            pod_name: pod_name.into(),
            namespace: None,
            remote_port: DEFAULT_COOP_PORT,
            kubeconfig: None,
            kubectl: PathBuf::from("kubectl"),
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = (!namespace.is_empty()).then_some(namespace);
        self
    }

    pub fn with_remote_port(mut self, port: u16) -> Self {
        self.remote_port = port;
        self
    }

    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    pub fn with_kubectl(mut self, binary: impl Into<PathBuf>) -> Self {
        self.kubectl = binary.into();
        self
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Arguments passed to kubectl for a tunnel on `local_port`.
    pub fn port_forward_args(&self, local_port: u16) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(kubeconfig) = &self.kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(kubeconfig.to_string_lossy().to_string());
        }
        args.push("port-forward".to_string());
        if let Some(namespace) = &self.namespace {
            args.push("-n".to_string());
            args.push(namespace.clone());
        }
        args.push(self.pod_name.clone());
        args.push(format!("{}:{}", local_port, self.remote_port));
        args
    }
}

struct TunnelState {
    local_port: u16,
    child: Child,
    stderr: Option<JoinHandle<String>>,
}

/// A port-forward to Coop in a single pod
pub struct PodTunnel {
    config: PodTunnelConfig,
    http_client: reqwest::Client,
    state: Mutex<Option<TunnelState>>,
}

impl PodTunnel {
    pub fn new(config: PodTunnelConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| TerminalError::Other(format!("building health probe client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
            state: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &PodTunnelConfig {
        &self.config
    }

    /// Start the port-forward and wait until Coop is healthy behind it.
    ///
    /// Returns the local base URL. On any failure the kubectl process is
    /// killed before returning.
    pub async fn open(&self, cancel: &CancellationToken) -> Result<String> {
        let mut state = self.state.lock().await;
        if state.is_some() {
            return Err(TerminalError::AlreadyOpen(self.config.pod_name.clone()));
        }

        let local_port = free_port()?;
        let mut child = Command::new(&self.config.kubectl)
            .args(self.config.port_forward_args(local_port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => TerminalError::NotAvailable("kubectl"),
                _ => TerminalError::PortForward(format!("starting kubectl port-forward: {}", e)),
            })?;

        let stderr = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf).await;
                buf
            })
        });

        info!(
            pod = %self.config.pod_name,
            local_port,
            remote_port = self.config.remote_port,
            "starting kubectl port-forward"
        );

        match self.wait_for_health(local_port, &mut child, cancel).await {
            Ok(()) => {
                info!(pod = %self.config.pod_name, local_port, "coop tunnel ready");
                *state = Some(TunnelState {
                    local_port,
                    child,
                    stderr,
                });
                Ok(local_url(local_port))
            }
            Err(err) => {
                if let Err(e) = child.kill().await {
                    debug!("killing kubectl port-forward: {}", e);
                }
                let diagnostics = collect_stderr(stderr).await;
                Err(attach_diagnostics(err, diagnostics))
            }
        }
    }

    /// Stop the port-forward. Does nothing when the tunnel is not open.
    pub async fn close(&self) -> Result<()> {
        let Some(mut tunnel) = self.state.lock().await.take() else {
            return Ok(());
        };
        if let Err(e) = tunnel.child.kill().await {
            debug!("kubectl port-forward already gone: {}", e);
        }
        if let Some(handle) = tunnel.stderr.take() {
            handle.abort();
        }
        info!(pod = %self.config.pod_name, local_port = tunnel.local_port, "coop tunnel closed");
        Ok(())
    }

    /// kubectl is still running and Coop answers through the tunnel.
    pub async fn is_alive(&self) -> bool {
        let local_port = {
            let mut state = self.state.lock().await;
            let Some(tunnel) = state.as_mut() else {
                return false;
            };
            if !matches!(tunnel.child.try_wait(), Ok(None)) {
                return false;
            }
            tunnel.local_port
        };
        // Lock released: `close` must not wait on the health check.
        let url = format!("{}{}", local_url(local_port), HEALTH_PATH);
        match self.http_client.get(&url).send().await {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                debug!(%url, "tunnel health probe failed: {}", e);
                false
            }
        }
    }

    pub async fn local_port(&self) -> Option<u16> {
        self.state.lock().await.as_ref().map(|t| t.local_port)
    }

    /// Base URL of the tunnel, e.g. "http://localhost:41234".
    pub async fn local_url(&self) -> Option<String> {
        self.local_port().await.map(local_url)
    }

    async fn wait_for_health(
        &self,
        local_port: u16,
        child: &mut Child,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let url = format!("{}{}", local_url(local_port), HEALTH_PATH);
        let deadline = Instant::now() + self.config.health_timeout;
        let mut interval = tokio::time::interval(self.config.poll_interval);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TerminalError::Cancelled),
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(TerminalError::HealthWait {
                        message: format!("timed out after {:?}", self.config.health_timeout),
                        diagnostics: None,
                    });
                }
                _ = interval.tick() => {}
            }

            if let Some(status) = child.try_wait()? {
                return Err(TerminalError::HealthWait {
                    message: format!("kubectl port-forward exited early ({})", status),
                    diagnostics: None,
                });
            }

            if self.probe_running(&url).await {
                return Ok(());
            }
        }
    }

    async fn probe_running(&self, url: &str) -> bool {
        let response = match self.http_client.get(url).send().await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => response,
            _ => return false,
        };
        matches!(response.json::<HealthResponse>().await, Ok(h) if h.status == "running")
    }
}

fn local_url(port: u16) -> String {
    format!("http://localhost:{}", port)
}

async fn collect_stderr(handle: Option<JoinHandle<String>>) -> Option<String> {
    let mut handle = handle?;
    match tokio::time::timeout(STDERR_GRACE, &mut handle).await {
        Ok(Ok(text)) => {
            let text = text.trim().to_string();
            (!text.is_empty()).then_some(text)
        }
        _ => {
            handle.abort();
            None
        }
    }
}

fn attach_diagnostics(err: TerminalError, stderr: Option<String>) -> TerminalError {
    match err {
        TerminalError::HealthWait { message, .. } => TerminalError::HealthWait {
            message,
            diagnostics: stderr,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_forward_args_minimal() {
        let config = PodTunnelConfig::new("gt-gastown-polecat-nux");
        assert_eq!(
            config.port_forward_args(41000),
            vec!["port-forward", "gt-gastown-polecat-nux", "41000:8080"]
        );
    }

    #[test]
    fn test_port_forward_args_full() {
        let config = PodTunnelConfig::new("hq-mayor")
            .with_namespace("gastown")
            .with_kubeconfig("/etc/kube/config")
            .with_remote_port(9090);
        assert_eq!(
            config.port_forward_args(41000),
            vec![
                "--kubeconfig",
                "/etc/kube/config",
                "port-forward",
                "-n",
                "gastown",
                "hq-mayor",
                "41000:9090"
            ]
        );
    }

    #[test]
    fn test_empty_namespace_is_omitted() {
        let config = PodTunnelConfig::new("pod").with_namespace("");
        assert_eq!(config.namespace, None);
    }

    #[test]
    fn test_attach_diagnostics_only_to_health_wait() {
        let err = attach_diagnostics(
            TerminalError::HealthWait {
                message: "timed out".into(),
                diagnostics: None,
            },
            Some("error: pod not found".into()),
        );
        assert!(err.to_string().contains("error: pod not found"));

        let err = attach_diagnostics(TerminalError::Cancelled, Some("ignored".into()));
        assert!(matches!(err, TerminalError::Cancelled));
    }

    #[tokio::test]
    async fn test_unopened_tunnel() {
        let tunnel = PodTunnel::new(PodTunnelConfig::new("pod")).unwrap();
        assert!(!tunnel.is_alive().await);
        assert_eq!(tunnel.local_port().await, None);
        assert_eq!(tunnel.local_url().await, None);
        tunnel.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_kubectl() {
        let config = PodTunnelConfig::new("pod").with_kubectl("/nonexistent/gt-test-kubectl");
        let tunnel = PodTunnel::new(config).unwrap();
        let err = tunnel.open(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, TerminalError::NotAvailable("kubectl")));
    }
}
