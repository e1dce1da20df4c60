//! Supervised process status and snapshots.

use std::time::SystemTime;

/// Lifecycle phase of the supervised agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessStatus {
    #[default]
    NotStarted,
    Starting,
    Running,
    Stopping,
    Stopped,
    /// The subprocess exited without being asked to. Terminal until an
    /// explicit new `start`.
    Crashed,
}

/// Point-in-time snapshot of the supervised agent.
///
/// Snapshots are owned copies; the live state never leaves the supervisor,
/// so holders of old snapshots cannot observe torn updates.
#[derive(Debug, Clone)]
pub struct ProcessState {
    pub status: ProcessStatus,
    pub pid: Option<u32>,
    /// Version reported by the agent's banner, once started.
    pub version: Option<String>,
    /// Base URL of the agent's local web API, once ready.
    pub api_url: Option<String>,
    pub started_at: Option<SystemTime>,
    /// Most recent log lines, capped at the configured buffer size.
    pub recent_logs: Vec<String>,
}
