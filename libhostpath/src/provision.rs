//! Creation step for `DirectoryOrCreate` and `FileOrCreate`.
//!
//! Both creators are atomic (`mkdir`, `O_CREAT|O_EXCL`).  A create that
//! loses a race reports [`Created::AlreadyExists`] so the checker can
//! re-inspect the path instead of failing.

use std::fs::{DirBuilder, OpenOptions, Permissions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::Path;

use tracing::debug;

use crate::config::ProvisionerConfig;
use crate::error::HostPathError;

/// Result of a creation attempt that did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Created {
    /// The entity was created with the given mode.
    New(u32),
    /// Something appeared at the path first.
    AlreadyExists,
}

/// Create a directory at `path` with `cfg.dir_mode`.
///
/// Missing parents are created first when `cfg.create_parents` is set; only
/// the final component decides between [`Created::New`] and
/// [`Created::AlreadyExists`].
pub fn create_directory(path: &Path, cfg: &ProvisionerConfig) -> Result<Created, HostPathError> {
    if cfg.create_parents
        && let Some(parent) = path.parent()
    {
        DirBuilder::new()
            .recursive(true)
            .mode(cfg.dir_mode)
            .create(parent)
            .map_err(|e| HostPathError::creation(parent, e))?;
    }

    match DirBuilder::new().mode(cfg.dir_mode).create(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "directory appeared concurrently");
            return Ok(Created::AlreadyExists);
        }
        Err(e) => return Err(HostPathError::creation(path, e)),
    }

    set_mode(path, cfg.dir_mode)?;
    Ok(Created::New(cfg.dir_mode))
}

/// Create an empty regular file at `path` with `cfg.file_mode`.
///
/// Parent directories are never created.
pub fn create_file(path: &Path, cfg: &ProvisionerConfig) -> Result<Created, HostPathError> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(cfg.file_mode)
        .open(path);

    match file {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "file appeared concurrently");
            return Ok(Created::AlreadyExists);
        }
        Err(e) => return Err(HostPathError::creation(path, e)),
    }

    set_mode(path, cfg.file_mode)?;
    Ok(Created::New(cfg.file_mode))
}

/// Apply `mode` exactly; the process umask has already masked the bits
/// passed to `mkdir`/`open`.
fn set_mode(path: &Path, mode: u32) -> Result<(), HostPathError> {
    std::fs::set_permissions(path, Permissions::from_mode(mode))
        .map_err(|e| HostPathError::creation(path, format!("set mode {mode:o}: {e}")))
}
