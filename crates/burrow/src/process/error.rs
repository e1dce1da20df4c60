//! Supervisor error types.

use std::time::Duration;

use burrow_installer::{ConfigValidationError, InstallerError};

/// Errors from supervising the agent process.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The agent exited or logged a fatal record before becoming ready.
    #[error("agent failed to start: {detail}")]
    Startup { detail: String },

    /// The ready marker never appeared within the startup budget. The
    /// half-started agent has already been killed.
    #[error("agent did not become ready within {timeout:?}")]
    StartupTimeout { timeout: Duration },

    /// The operation requires a running agent.
    #[error("agent process has not been started")]
    NotStarted,

    #[error(transparent)]
    Installer(#[from] InstallerError),

    #[error(transparent)]
    Config(#[from] ConfigValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
