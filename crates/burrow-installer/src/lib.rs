//! Burrow Installer
//!
//! Fetches the agent binary for the host platform from its CDN, installs it
//! with the executable bit set, and writes validated default config files.

mod binary;
mod config_file;

pub use binary::{InstallerError, install_binary, install_binary_from};
pub use config_file::{
    ALLOWED_KEYS, ConfigValidationError, install_default_config, read_config, validate_config_file,
    validate_overrides,
};
