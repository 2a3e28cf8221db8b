//! Error type shared by every session backend.

use std::time::Duration;

/// Boxed source error for transport faults coming from backend-specific crates.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by session backends, the pod tunnel and the resolver.
///
/// Absence ("the session does not exist") is never an error: backends report it
/// as `Ok(false)`. Every variant here is something the caller has to act on.
#[derive(thiserror::Error, Debug)]
pub enum TerminalError {
    #[error("{0} is not available")]
    NotAvailable(&'static str),

    #[error("{backend}: no session registered for {session:?}")]
    NotRegistered {
        backend: &'static str,
        session: String,
    },

    #[error("{command} command timed out after {timeout:?}: {args:?}")]
    Timeout {
        command: String,
        args: Vec<String>,
        timeout: Duration,
    },

    #[error("{0}")]
    CommandFailed(String),

    #[error("{backend}: {endpoint} request failed: {source}")]
    Request {
        backend: &'static str,
        endpoint: String,
        #[source]
        source: BoxError,
    },

    #[error("{backend}: {endpoint} returned {status}: {body}")]
    Status {
        backend: &'static str,
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("{backend}: parsing {endpoint} response: {source}")]
    Decode {
        backend: &'static str,
        endpoint: String,
        #[source]
        source: BoxError,
    },

    #[error("{backend}: {action} not delivered: {reason}")]
    NotDelivered {
        backend: &'static str,
        action: &'static str,
        reason: String,
    },

    #[error("{0}")]
    MissingConfig(String),

    #[error("{0}")]
    NotFound(String),

    #[error("tunnel to pod {0:?} is already open")]
    AlreadyOpen(String),

    #[error("port-forward failed: {0}")]
    PortForward(String),

    #[error("waiting for coop health: {message}{}", diagnostics_suffix(.diagnostics))]
    HealthWait {
        message: String,
        diagnostics: Option<String>,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

fn diagnostics_suffix(diagnostics: &Option<String>) -> String {
    match diagnostics {
        Some(text) if !text.is_empty() => format!(" (kubectl: {text})"),
        _ => String::new(),
    }
}

impl TerminalError {
    pub fn not_registered(backend: &'static str, session: impl Into<String>) -> Self {
        Self::NotRegistered {
            backend,
            session: session.into(),
        }
    }

    pub fn request(
        backend: &'static str,
        endpoint: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Request {
            backend,
            endpoint: endpoint.into(),
            source: source.into(),
        }
    }

    pub fn decode(
        backend: &'static str,
        endpoint: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Decode {
            backend,
            endpoint: endpoint.into(),
            source: source.into(),
        }
    }

    /// Build a delivery failure, defaulting the reason to `unknown`.
    pub fn not_delivered(backend: &'static str, action: &'static str, reason: Option<String>) -> Self {
        Self::NotDelivered {
            backend,
            action,
            reason: reason.unwrap_or_else(|| "unknown".to_string()),
        }
    }

    /// True for errors caused by a session missing from a backend registry.
    pub fn is_not_registered(&self) -> bool {
        matches!(self, Self::NotRegistered { .. })
    }
}
