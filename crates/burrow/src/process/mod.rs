//! Agent process supervision.
//!
//! At most one agent subprocess per supervisor instance. Readiness is
//! decided by consuming the agent's log stream inline during `start`;
//! teardown is graceful-signal-then-kill.

mod error;
mod state;
mod supervisor;

pub use error::ProcessError;
pub use state::{ProcessState, ProcessStatus};
pub use supervisor::NgrokProcess;
