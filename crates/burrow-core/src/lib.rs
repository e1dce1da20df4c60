//! Burrow Core Library
//!
//! Shared functionality for the burrow workspace:
//! - Platform resolution for agent binary downloads
//! - Agent configuration and version-family CLI dialects
//! - Structured log-record parsing and readiness/error marker tables
//! - Tracing initialization

pub mod config;
pub mod log;
pub mod platform;
pub mod tracing_init;

pub use config::{AgentConfig, NgrokVersion};
pub use log::{LogRecord, MarkerSet};
pub use platform::{PlatformDescriptor, UnsupportedPlatformError};
