//! Symlink resolution and classification of what lives at a host path.

use std::ffi::OsStr;
use std::fs::{FileType, Metadata};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use nix::errno::Errno;

use crate::error::HostPathError;
use crate::types::PathState;

/// Result of inspecting a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    /// Kind of the entity reached after following links.
    pub state: PathState,
    /// The path itself is a symbolic link.
    pub is_symlink: bool,
    /// Immediate target of the link, when `is_symlink`.
    pub link_target: Option<PathBuf>,
    /// Fully resolved location; equal to the input path unless it is a link
    /// to an existing entity.
    pub resolved_path: PathBuf,
}

impl Inspection {
    /// A symlink whose target does not exist.
    pub fn is_broken_link(&self) -> bool {
        self.is_symlink && self.state == PathState::Missing
    }
}

/// Map a followed file type onto a [`PathState`].
pub fn classify(file_type: FileType) -> PathState {
    if file_type.is_dir() {
        PathState::IsDirectory
    } else if file_type.is_file() {
        PathState::IsRegularFile
    } else if file_type.is_socket() {
        PathState::IsSocket
    } else if file_type.is_char_device() {
        PathState::IsCharDevice
    } else if file_type.is_block_device() {
        PathState::IsBlockDevice
    } else {
        PathState::IsOtherOrUnsupported
    }
}

/// Absent, or reached through a non-directory ancestor.
fn is_absent(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::NotFound || is_not_dir(e)
}

fn is_not_dir(e: &io::Error) -> bool {
    e.raw_os_error() == Some(Errno::ENOTDIR as i32)
}

fn is_loop(e: &io::Error) -> bool {
    e.raw_os_error() == Some(Errno::ELOOP as i32)
}

/// `path` without trailing separators, if it had any besides the root.
fn without_trailing_slash(path: &Path) -> Option<PathBuf> {
    let bytes = path.as_os_str().as_bytes();
    let mut end = bytes.len();
    while end > 1 && bytes[end - 1] == b'/' {
        end -= 1;
    }
    (end < bytes.len()).then(|| PathBuf::from(OsStr::from_bytes(&bytes[..end])))
}

/// Inspect `path`, following symbolic links before classifying.
///
/// The link node is examined with `lstat` only to learn whether it is a
/// link; the reported [`PathState`] always describes the final target.
pub fn inspect(path: &Path) -> Result<Inspection, HostPathError> {
    let link_meta = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        // `<non-directory>/`: judge the entity itself, not as absent.
        Err(e) if is_not_dir(&e) => {
            return match without_trailing_slash(path) {
                Some(trimmed) => inspect(&trimmed),
                None => Ok(missing(path)),
            };
        }
        Err(e) if is_absent(&e) => return Ok(missing(path)),
        Err(e) if is_loop(&e) => return Err(link_failed(path, e)),
        Err(e) => return Err(HostPathError::inspection(path, e)),
    };

    if !link_meta.file_type().is_symlink() {
        return Ok(Inspection {
            state: classify(link_meta.file_type()),
            is_symlink: false,
            link_target: None,
            resolved_path: path.to_path_buf(),
        });
    }

    let link_target = std::fs::read_link(path).map_err(|e| HostPathError::inspection(path, e))?;
    match std::fs::metadata(path) {
        Ok(target_meta) => Ok(followed(path, link_target, &target_meta)),
        Err(e) if is_absent(&e) => Ok(Inspection {
            state: PathState::Missing,
            is_symlink: true,
            link_target: Some(link_target),
            resolved_path: path.to_path_buf(),
        }),
        Err(e) if is_loop(&e) => Err(link_failed(path, e)),
        Err(e) => Err(HostPathError::inspection(path, e)),
    }
}

fn followed(path: &Path, link_target: PathBuf, target_meta: &Metadata) -> Inspection {
    // Falls back to the link itself if the target vanished since `stat`.
    let resolved_path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    Inspection {
        state: classify(target_meta.file_type()),
        is_symlink: true,
        link_target: Some(link_target),
        resolved_path,
    }
}

fn missing(path: &Path) -> Inspection {
    Inspection {
        state: PathState::Missing,
        is_symlink: false,
        link_target: None,
        resolved_path: path.to_path_buf(),
    }
}

fn link_failed(path: &Path, e: io::Error) -> HostPathError {
    HostPathError::LinkResolutionFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}
