use std::collections::HashMap;

/// Severity parsed from a record's level field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Crit,
    Other(String),
}

impl Level {
    /// Parse the level token the agent writes (`lvl=eror`, `"level":"info"`,
    /// ...). Unknown tokens are preserved rather than dropped.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "dbug" | "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" | "warning" => Self::Warn,
            "eror" | "error" => Self::Error,
            "crit" | "critical" | "fatal" => Self::Crit,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One structured record from the agent's log stream.
///
/// Lines that are neither logfmt nor JSON still produce a record, with the
/// whole line as the message and no level.
#[derive(Debug, Clone, Default)]
pub struct LogRecord {
    pub level: Option<Level>,
    pub message: String,
    pub fields: HashMap<String, String>,
}

impl LogRecord {
    /// Look up a named field, `None` when absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}
