//! Log-line parser for the agent's stdout.
//!
//! Accepts logfmt (`t=... lvl=info msg="starting web service" addr=...`) and
//! JSON object lines. Unknown fields are kept; unparseable lines degrade to a
//! bare message rather than an error.

use std::collections::HashMap;

use serde_json::Value;

use super::types::{Level, LogRecord};

/// Parse a single line of agent output into a canonical record.
pub fn parse_line(line: &str) -> LogRecord {
    let trimmed = line.trim();
    if trimmed.starts_with('{') {
        if let Some(record) = parse_json(trimmed) {
            return record;
        }
    }
    if let Some(pairs) = parse_logfmt(trimmed) {
        return from_pairs(pairs);
    }
    LogRecord {
        level: None,
        message: trimmed.to_string(),
        fields: HashMap::new(),
    }
}

fn from_pairs(pairs: Vec<(String, String)>) -> LogRecord {
    let mut record = LogRecord::default();
    for (key, value) in pairs {
        match key.as_str() {
            "lvl" | "level" => record.level = Some(Level::parse(&value)),
            "msg" | "message" => record.message = value,
            _ => {
                record.fields.insert(key, value);
            }
        }
    }
    record
}

fn parse_json(line: &str) -> Option<LogRecord> {
    let value: Value = serde_json::from_str(line).ok()?;
    let object = value.as_object()?;
    let pairs = object
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect();
    Some(from_pairs(pairs))
}

/// Tokenize a logfmt line into key/value pairs. Values may be bare or
/// double-quoted with backslash escapes. Returns `None` when the line holds
/// no `key=value` token at all.
fn parse_logfmt(line: &str) -> Option<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    let mut rest = line;

    while !rest.is_empty() {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }

        let Some(key_end) = rest.find(['=', ' ']) else {
            // Trailing bare token, not a pair.
            break;
        };
        if rest.as_bytes()[key_end] == b' ' {
            // Bare token without '='; skip it.
            rest = &rest[key_end..];
            continue;
        }
        let key = rest[..key_end].to_string();
        rest = &rest[key_end + 1..];

        let value = if let Some(quoted) = rest.strip_prefix('"') {
            let mut buf = String::new();
            let mut consumed = quoted.len();
            let mut escaped = false;
            for (i, c) in quoted.char_indices() {
                if escaped {
                    buf.push(c);
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    consumed = i + 1;
                    break;
                } else {
                    buf.push(c);
                }
            }
            rest = &quoted[consumed..];
            buf
        } else {
            let end = rest.find(' ').unwrap_or(rest.len());
            let value = rest[..end].to_string();
            rest = &rest[end..];
            value
        };

        pairs.push((key, value));
    }

    if pairs.is_empty() { None } else { Some(pairs) }
}
