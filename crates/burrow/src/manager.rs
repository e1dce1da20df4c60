//! Tunnel manager: supervised agent plus local API client.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info};

use burrow_core::AgentConfig;

use crate::http::types::{CapturedRequestsResponse, Tunnel, TunnelRequest, TunnelsResponse};
use crate::http::{ApiClient, ApiError};
use crate::process::{NgrokProcess, ProcessError};

/// Errors from tunnel management.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("no known tunnel matches {0}")]
    TunnelNotFound(String),
}

/// Manages tunnels over a supervised agent's local API.
///
/// Strictly pull-based: the cache of known tunnels is replaced wholesale on
/// every list call and never refreshed in the background. The agent, not
/// this client, is the authority on live tunnels.
pub struct TunnelManager {
    process: NgrokProcess,
    client: Option<ApiClient>,
    tunnels: HashMap<String, Tunnel>,
}

impl TunnelManager {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            process: NgrokProcess::new(config),
            client: None,
            tunnels: HashMap::new(),
        }
    }

    /// The supervised process, e.g. for state snapshots.
    pub const fn process(&self) -> &NgrokProcess {
        &self.process
    }

    pub fn process_mut(&mut self) -> &mut NgrokProcess {
        &mut self.process
    }

    /// Create a tunnel, cache its snapshot, and return it.
    pub async fn connect(&mut self, request: TunnelRequest) -> Result<Tunnel, ManagerError> {
        let client = self.ensure_running().await?;
        let response = client.post::<_, Tunnel>("/api/tunnels", &request, &[]).await?;
        let tunnel = response.body;
        info!(name = %tunnel.name, public_url = %tunnel.public_url, "tunnel connected");
        self.tunnels.insert(tunnel.name.clone(), tunnel.clone());
        Ok(tunnel)
    }

    /// Close a tunnel, addressed by name or public URL.
    ///
    /// Falls back to a fresh listing when the tunnel is not in the cache,
    /// e.g. one created by another client of the same agent.
    pub async fn disconnect(&mut self, name_or_url: &str) -> Result<(), ManagerError> {
        let client = self.ensure_running().await?;
        if !self.cached(name_or_url) {
            self.refresh(&client).await?;
        }
        let tunnel = self
            .tunnels
            .values()
            .find(|tunnel| tunnel.name == name_or_url || tunnel.public_url == name_or_url)
            .ok_or_else(|| ManagerError::TunnelNotFound(name_or_url.to_string()))?;
        let uri = tunnel.uri.clone();
        let name = tunnel.name.clone();

        client.delete(&uri, &[]).await?;
        self.tunnels.remove(&name);
        info!(name = %name, "tunnel disconnected");
        Ok(())
    }

    /// List tunnels from the agent. The cache is replaced, not merged: the
    /// response is an authoritative snapshot.
    pub async fn tunnels(&mut self) -> Result<Vec<Tunnel>, ManagerError> {
        let client = self.ensure_running().await?;
        self.refresh(&client).await?;
        Ok(self.tunnels.values().cloned().collect())
    }

    /// Captured traffic from the agent's inspector, optionally filtered to
    /// one tunnel by exact name.
    pub async fn captured_requests(
        &mut self,
        tunnel_name: Option<&str>,
    ) -> Result<CapturedRequestsResponse, ManagerError> {
        let client = self.ensure_running().await?;
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(name) = tunnel_name {
            params.push(("tunnel_name", name));
        }
        let response = client
            .get::<CapturedRequestsResponse>("/api/requests/http", &params)
            .await?;
        Ok(response.body)
    }

    /// Stop the supervised agent and drop all cached state.
    pub async fn stop(&mut self) -> Result<(), ManagerError> {
        self.process.stop().await?;
        self.client = None;
        self.tunnels.clear();
        Ok(())
    }

    /// Ensure the agent is up and return a client bound to its current web
    /// API address. A restart under a different address rebuilds the client.
    async fn ensure_running(&mut self) -> Result<ApiClient, ManagerError> {
        let state = self.process.start().await?;
        let api_url = state.api_url.ok_or(ProcessError::NotStarted)?;
        let current = self
            .client
            .as_ref()
            .is_some_and(|client| client.base_url() == api_url.trim_end_matches('/'));
        if !current {
            self.client = Some(ApiClient::new(&api_url)?);
        }
        self.client
            .clone()
            .ok_or(ManagerError::Process(ProcessError::NotStarted))
    }

    fn cached(&self, name_or_url: &str) -> bool {
        self.tunnels
            .values()
            .any(|tunnel| tunnel.name == name_or_url || tunnel.public_url == name_or_url)
    }

    async fn refresh(&mut self, client: &ApiClient) -> Result<(), ManagerError> {
        let response = client.get::<TunnelsResponse>("/api/tunnels", &[]).await?;
        self.tunnels = response
            .body
            .tunnels
            .into_iter()
            .map(|tunnel| (tunnel.name.clone(), tunnel))
            .collect();
        debug!(count = self.tunnels.len(), "tunnel cache refreshed");
        Ok(())
    }
}
