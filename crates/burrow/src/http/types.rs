//! Local API request/response types.
//!
//! Serialization structs matching the agent's tunnel-management JSON.

use serde::{Deserialize, Serialize};

/// Protocol a tunnel forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Proto {
    Http,
    Tcp,
    Tls,
}

impl std::fmt::Display for Proto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Tcp => write!(f, "tcp"),
            Self::Tls => write!(f, "tls"),
        }
    }
}

/// Request body for `POST /api/tunnels`.
///
/// Immutable once assembled: construct with `new`, attach optional fields
/// with the consuming `with_*` methods.
#[derive(Debug, Clone, Serialize)]
pub struct TunnelRequest {
    pub name: String,
    pub proto: Proto,
    pub addr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_tls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
}

impl TunnelRequest {
    pub fn new(name: impl Into<String>, proto: Proto, addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            proto,
            addr: addr.into(),
            bind_tls: None,
            subdomain: None,
            hostname: None,
            auth: None,
        }
    }

    pub fn with_bind_tls(mut self, bind_tls: bool) -> Self {
        self.bind_tls = Some(bind_tls);
        self
    }

    pub fn with_subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }
}

/// Local target a tunnel forwards to.
#[derive(Debug, Clone, Deserialize)]
pub struct TunnelTarget {
    pub addr: String,
    #[serde(default)]
    pub inspect: bool,
}

/// One tunnel as reported by the agent.
#[derive(Debug, Clone, Deserialize)]
pub struct Tunnel {
    pub name: String,
    /// API resource URI, the handle for `DELETE`.
    pub uri: String,
    pub public_url: String,
    pub proto: String,
    pub config: TunnelTarget,
}

/// Body of `GET /api/tunnels`.
#[derive(Debug, Clone, Deserialize)]
pub struct TunnelsResponse {
    pub tunnels: Vec<Tunnel>,
}

/// One captured request from the agent's traffic inspector (subset of
/// fields).
#[derive(Debug, Clone, Deserialize)]
pub struct CapturedRequest {
    pub id: String,
    pub tunnel_name: String,
    #[serde(default)]
    pub remote_addr: Option<String>,
    #[serde(default)]
    pub duration: i64,
}

/// Body of `GET /api/requests/http`.
#[derive(Debug, Clone, Deserialize)]
pub struct CapturedRequestsResponse {
    #[serde(default)]
    pub requests: Vec<CapturedRequest>,
}
