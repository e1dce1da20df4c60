//! Readiness and fatal-error marker tables.
//!
//! The message text and field names the agent uses are an external surface
//! that shifts between its major versions. Both dialects live here, as data,
//! so the supervisor never hard-codes them.

use crate::config::NgrokVersion;

use super::types::{Level, LogRecord};

/// Matcher table applied to each startup log record.
#[derive(Debug, Clone)]
pub struct MarkerSet {
    /// Message of the record announcing the local web API is listening.
    pub ready_message: String,
    /// Field on the ready record carrying the bound address.
    pub addr_field: String,
    /// Field carrying error detail on failure records.
    pub error_field: String,
    /// Levels that terminate startup when seen before the ready marker.
    pub fatal_levels: Vec<Level>,
}

impl MarkerSet {
    /// Markers for the v2 generation. Errors during session establishment
    /// are retried internally and logged at `eror`; only `crit` is terminal.
    pub fn v2() -> Self {
        Self {
            ready_message: "starting web service".into(),
            addr_field: "addr".into(),
            error_field: "err".into(),
            fatal_levels: vec![Level::Crit],
        }
    }

    /// Markers for the v3 generation, which fails fast: both `eror` and
    /// `crit` records before readiness are terminal.
    pub fn v3() -> Self {
        Self {
            ready_message: "starting web service".into(),
            addr_field: "addr".into(),
            error_field: "err".into(),
            fatal_levels: vec![Level::Error, Level::Crit],
        }
    }

    /// Table matching the given version family's dialect.
    pub fn for_version(version: NgrokVersion) -> Self {
        match version {
            NgrokVersion::V2 => Self::v2(),
            NgrokVersion::V3 => Self::v3(),
        }
    }

    /// Bound address of the local web API when this record is the ready
    /// marker.
    pub fn ready_addr(&self, record: &LogRecord) -> Option<String> {
        if record.message == self.ready_message {
            record.field(&self.addr_field).map(str::to_string)
        } else {
            None
        }
    }

    /// Error detail when this record is a terminal startup failure.
    pub fn fatal_detail(&self, record: &LogRecord) -> Option<String> {
        let is_fatal = record
            .level
            .as_ref()
            .is_some_and(|level| self.fatal_levels.contains(level));
        if !is_fatal {
            return None;
        }
        let error = record
            .field(&self.error_field)
            .filter(|value| !value.is_empty() && *value != "nil");
        Some(match error {
            Some(error) if record.message.is_empty() => error.to_string(),
            Some(error) => format!("{}: {error}", record.message),
            None => record.message.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::log::parse_line;

    #[test]
    fn ready_marker_carries_address() {
        let markers = MarkerSet::v3();
        let record = parse_line(r#"lvl=info msg="starting web service" obj=web addr=127.0.0.1:4040"#);
        assert_eq!(markers.ready_addr(&record).as_deref(), Some("127.0.0.1:4040"));
    }

    #[test]
    fn non_ready_record_has_no_address() {
        let markers = MarkerSet::v3();
        let record = parse_line(r#"lvl=info msg="tunnel session started" addr=10.0.0.1:443"#);
        assert!(markers.ready_addr(&record).is_none());
    }

    #[test]
    fn v2_error_level_is_not_terminal() {
        let markers = MarkerSet::v2();
        let record = parse_line(r#"lvl=eror msg="failed to reconnect session" err="dial timeout""#);
        assert!(markers.fatal_detail(&record).is_none());
    }

    #[test]
    fn v2_crit_is_terminal() {
        let markers = MarkerSet::v2();
        let record = parse_line(r#"lvl=crit msg="failed to bind" err="address in use""#);
        assert_eq!(
            markers.fatal_detail(&record).as_deref(),
            Some("failed to bind: address in use")
        );
    }

    #[test]
    fn v3_error_level_is_terminal() {
        let markers = MarkerSet::v3();
        let record = parse_line(r#"lvl=eror msg="authentication failed" err="invalid token""#);
        assert_eq!(
            markers.fatal_detail(&record).as_deref(),
            Some("authentication failed: invalid token")
        );
    }

    #[test]
    fn nil_error_field_is_ignored() {
        let markers = MarkerSet::v3();
        let record = parse_line(r#"lvl=crit msg="terminating" err=nil"#);
        assert_eq!(markers.fatal_detail(&record).as_deref(), Some("terminating"));
    }

    #[test]
    fn custom_marker_override() {
        let mut markers = MarkerSet::v3();
        markers.ready_message = "web interface up".into();
        markers.addr_field = "listen".into();
        let record = parse_line(r#"lvl=info msg="web interface up" listen=localhost:4041"#);
        assert_eq!(markers.ready_addr(&record).as_deref(), Some("localhost:4041"));
    }
}
