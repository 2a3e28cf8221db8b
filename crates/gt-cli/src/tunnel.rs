//! `gt-term tunnel`: local port-forward to an agent pod's Coop sidecar

use crate::ConnectionArgs;
use anyhow::{Context, Result};
use clap::Args;
use gt_terminal::tunnel::DEFAULT_COOP_PORT;
use gt_terminal::{PodTunnel, PodTunnelConfig};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Args, Debug)]
pub struct TunnelArgs {
    /// Agent address or pod name
    #[arg(value_name = "AGENT_OR_POD")]
    pub target: String,

    /// Kubernetes namespace (defaults to the one in agent notes)
    #[arg(short = 'n', long, env = "GT_K8S_NAMESPACE")]
    pub namespace: Option<String>,

    /// kubeconfig file passed to kubectl
    #[arg(long, env = "KUBECONFIG", value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Coop port inside the pod
    #[arg(long, default_value_t = DEFAULT_COOP_PORT)]
    pub port: u16,

    /// kubectl binary
    #[arg(long, value_name = "PATH", default_value = "kubectl")]
    pub kubectl: PathBuf,

    /// Seconds to wait for Coop to become healthy
    #[arg(long, value_name = "SECS", default_value_t = 15)]
    pub health_timeout: u64,
}

impl TunnelArgs {
    /// Tunnel settings for a pod, with flags taking precedence over notes.
    pub fn tunnel_config(&self, pod_name: &str, notes_namespace: Option<String>) -> PodTunnelConfig {
        let mut config = PodTunnelConfig::new(pod_name)
            .with_remote_port(self.port)
            .with_kubectl(&self.kubectl)
            .with_health_timeout(Duration::from_secs(self.health_timeout));
        if let Some(namespace) = self.namespace.clone().or(notes_namespace) {
            config = config.with_namespace(namespace);
        }
        if let Some(kubeconfig) = self.kubeconfig.as_ref().filter(|p| !p.as_os_str().is_empty()) {
            config = config.with_kubeconfig(kubeconfig);
        }
        config
    }

    pub async fn run(&self, conn: &ConnectionArgs) -> Result<()> {
        let config = match conn.resolver().resolve_pod_info(&self.target).await {
            Ok(info) => {
                debug!(pod = %info.pod_name, coop_url = %info.coop_url, "resolved agent pod");
                self.tunnel_config(&info.pod_name, info.namespace)
            }
            Err(e) => {
                debug!("{}; treating {:?} as a pod name", e, self.target);
                self.tunnel_config(&self.target, None)
            }
        };

        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });

        let pod = config.pod_name.clone();
        let tunnel = PodTunnel::new(config)?;
        let url = tunnel
            .open(&cancel)
            .await
            .with_context(|| format!("opening tunnel to pod {}", pod))?;
        println!("{}", url);
        info!(%url, "tunnel open, press Ctrl-C to close");

        cancel.cancelled().await;
        tunnel.close().await?;
        Ok(())
    }
}
