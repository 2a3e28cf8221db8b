//! Authentication for Coop API requests

use gt_terminal_core::{Result, TerminalError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

/// Authentication methods accepted by a Coop sidecar
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthMethod {
    /// Bearer token (`Authorization: Bearer <token>`)
    Bearer(String),
    /// No authentication
    #[default]
    None,
}

impl AuthMethod {
    /// Bearer auth for a non-empty token, no auth otherwise.
    pub fn from_token(token: Option<&str>) -> Self {
        match token.map(str::trim) {
            Some(token) if !token.is_empty() => Self::Bearer(token.to_string()),
            _ => Self::None,
        }
    }

    /// Create bearer token authentication
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }

    /// Get headers for this authentication method
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let AuthMethod::Bearer(token) = self {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| TerminalError::Other(format!("invalid coop token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}
