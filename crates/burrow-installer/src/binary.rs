//! Agent binary download and installation.
//!
//! The CDN artifact is a gzip-compressed single executable. Installation
//! stages the decompressed binary next to its destination and renames it
//! into place, so a prior binary is replaced atomically.

use std::io;
use std::path::Path;

use flate2::read::GzDecoder;
use thiserror::Error;
use tracing::{debug, info};

use burrow_core::NgrokVersion;
use burrow_core::platform::{self, UnsupportedPlatformError};

/// Errors from binary installation.
#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("download failed: {0}")]
    Download(String),

    #[error("artifact extraction failed: {0}")]
    Archive(String),

    #[error("no permission to write {path}")]
    Permission { path: String },

    #[error(transparent)]
    Platform(#[from] UnsupportedPlatformError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Keep permission failures distinguishable from generic I/O: callers probe
/// for them specifically.
fn classify_io(path: &Path, err: io::Error) -> InstallerError {
    if err.kind() == io::ErrorKind::PermissionDenied {
        InstallerError::Permission {
            path: path.display().to_string(),
        }
    } else {
        InstallerError::Io(err)
    }
}

/// Download and install the agent binary for the host platform at `dest`.
///
/// Re-entrant: an existing binary at `dest` is overwritten. Version pinning
/// is the caller's job, by choosing a distinct path per version.
pub async fn install_binary(dest: &Path, version: NgrokVersion) -> Result<(), InstallerError> {
    let descriptor = platform::resolve_host(version)?;
    install_binary_from(&descriptor.download_url, dest).await
}

/// Same as [`install_binary`] with the artifact URL already resolved.
pub async fn install_binary_from(url: &str, dest: &Path) -> Result<(), InstallerError> {
    info!(url, dest = %dest.display(), "installing agent binary");

    // Ensure a TLS crypto provider is installed (reqwest uses rustls-no-provider).
    // The `Err` case just means it was already installed -- safe to ignore.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let client = reqwest::Client::builder()
        .build()
        .map_err(|e| InstallerError::Download(e.to_string()))?;
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| InstallerError::Download(e.to_string()))?;
    if !response.status().is_success() {
        return Err(InstallerError::Download(format!(
            "CDN returned {} for {url}",
            response.status()
        )));
    }
    let compressed = response
        .bytes()
        .await
        .map_err(|e| InstallerError::Download(e.to_string()))?;
    debug!(bytes = compressed.len(), "artifact downloaded");

    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| classify_io(parent, e))?;

    // Stage in the destination directory so the final rename cannot cross
    // filesystems.
    let mut staged = tempfile::NamedTempFile::new_in(parent).map_err(|e| classify_io(parent, e))?;
    let mut decoder = GzDecoder::new(compressed.as_ref());
    io::copy(&mut decoder, &mut staged).map_err(|e| match e.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof => {
            InstallerError::Archive(e.to_string())
        }
        _ => classify_io(dest, e),
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(staged.path(), std::fs::Permissions::from_mode(0o755))
            .map_err(|e| classify_io(dest, e))?;
    }

    staged.persist(dest).map_err(|e| classify_io(dest, e.error))?;
    info!(dest = %dest.display(), "agent binary installed");
    Ok(())
}
