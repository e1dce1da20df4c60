//! Agent configuration and version-family CLI dialects.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::log::MarkerSet;
use crate::platform::{self, UnsupportedPlatformError};

/// Major version family of the agent binary.
///
/// The two supported generations use different CDN layouts and different CLI
/// flag dialects; everything that branches on the generation goes through
/// this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NgrokVersion {
    V2,
    #[default]
    V3,
}

impl std::fmt::Display for NgrokVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V2 => write!(f, "v2"),
            Self::V3 => write!(f, "v3"),
        }
    }
}

impl NgrokVersion {
    /// Major component the agent's `--version` banner must report.
    pub const fn major(self) -> u64 {
        match self {
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }

    /// Value written to the `version` key of a generated config file.
    pub const fn config_value(self) -> &'static str {
        match self {
            Self::V2 => "2",
            Self::V3 => "3",
        }
    }

    /// Build the agent launch argument list in this family's flag dialect.
    ///
    /// The v2 generation takes single-dash long flags; v3 switched to
    /// double-dash and grew an explicit log-format flag.
    pub fn start_args(
        self,
        config_path: &Path,
        auth_token: Option<&str>,
        region: Option<&str>,
    ) -> Vec<String> {
        let config = config_path.display().to_string();
        let mut args: Vec<String> = vec!["start".into(), "--none".into()];
        match self {
            Self::V2 => {
                args.push("-log=stdout".into());
                args.push("-config".into());
                args.push(config);
                if let Some(token) = auth_token {
                    args.push("-authtoken".into());
                    args.push(token.into());
                }
                if let Some(region) = region {
                    args.push("-region".into());
                    args.push(region.into());
                }
            }
            Self::V3 => {
                args.push("--log=stdout".into());
                args.push("--log-format=logfmt".into());
                args.push("--config".into());
                args.push(config);
                if let Some(token) = auth_token {
                    args.push("--authtoken".into());
                    args.push(token.into());
                }
                if let Some(region) = region {
                    args.push("--region".into());
                    args.push(region.into());
                }
            }
        }
        args
    }
}

/// Configuration for one supervised agent instance.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Path to the agent binary. Installed on demand when missing.
    pub binary_path: PathBuf,

    /// Path to the agent config file. A validated default is written when
    /// missing.
    pub config_path: PathBuf,

    /// Major version family to install and launch.
    pub version: NgrokVersion,

    /// Auth token passed on the launch command line.
    pub auth_token: Option<String>,

    /// Region passed on the launch command line.
    pub region: Option<String>,

    /// Budget for the ready marker to appear in the log stream.
    pub startup_timeout: Duration,

    /// Grace period between the termination signal and a force-kill.
    pub terminate_timeout: Duration,

    /// Capacity of the diagnostic ring buffer of recent log lines.
    pub max_log_lines: usize,

    /// Ready/error marker table for the agent's log dialect. Defaults to the
    /// table matching `version`; override when the agent's field names drift.
    pub markers: MarkerSet,
}

impl AgentConfig {
    /// Create a config with explicit paths and defaults for everything else.
    pub fn new(
        binary_path: impl Into<PathBuf>,
        config_path: impl Into<PathBuf>,
        version: NgrokVersion,
    ) -> Self {
        Self {
            binary_path: binary_path.into(),
            config_path: config_path.into(),
            version,
            auth_token: None,
            region: None,
            startup_timeout: Duration::from_secs(15),
            terminate_timeout: Duration::from_secs(5),
            max_log_lines: 100,
            markers: MarkerSet::for_version(version),
        }
    }

    /// Create a config rooted in the conventional per-user agent directory,
    /// with binary/config filenames resolved for the host platform.
    pub fn for_host(version: NgrokVersion) -> Result<Self, UnsupportedPlatformError> {
        let descriptor = platform::resolve_host(version)?;
        let dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ngrok2");
        Ok(Self::new(
            dir.join(descriptor.binary_name),
            dir.join(descriptor.config_name),
            version,
        ))
    }
}
