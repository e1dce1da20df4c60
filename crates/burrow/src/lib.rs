//! Burrow
//!
//! Supervises a local ngrok agent binary and drives its control-plane REST
//! API as a typed client:
//! - Process supervision: launch, readiness by inline log-tail, teardown
//! - On-demand binary installation for the host platform
//! - Typed HTTP client for the agent's local API
//! - Tunnel manager combining the two

pub mod http;
pub mod manager;
pub mod process;

pub use burrow_core::{AgentConfig, NgrokVersion};
pub use manager::{ManagerError, TunnelManager};
pub use process::{NgrokProcess, ProcessError, ProcessState, ProcessStatus};
