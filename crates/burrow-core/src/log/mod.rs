//! Structured log records from the agent's stdout stream.
//!
//! The agent emits one record per line, as logfmt or JSON depending on its
//! generation and flags. This module parses lines into canonical records,
//! implementing a tolerant reader pattern, and holds the per-generation
//! marker tables used to detect readiness and fatal startup errors.

mod markers;
mod parser;
mod types;

pub use markers::MarkerSet;
pub use parser::parse_line;
pub use types::{Level, LogRecord};
