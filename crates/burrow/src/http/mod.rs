//! Typed client for the agent's local REST API.

mod client;
pub mod types;

pub use client::{ApiClient, ApiError, ApiResponse, RequestHook};
