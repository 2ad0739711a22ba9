//! Core host-path types: declared types, observed path states, requests and
//! decisions.
//!
//! These types form the data model shared by the checker, the provisioner
//! and the volume set-up flow.  They are all [`Serialize`]/[`Deserialize`]
//! so they can be read straight from a pod manifest or handed to another
//! component as JSON.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HostPathError;

// ---------------------------------------------------------------------------
// Declared type
// ---------------------------------------------------------------------------

/// The type a pod manifest declares for a hostPath volume.
///
/// The wire form is the manifest tag: the variant name, or the empty string
/// for [`HostPathType::Unset`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum HostPathType {
    /// Create an empty directory (0755) if nothing exists at the path.
    DirectoryOrCreate,
    /// A directory must exist at the path.
    Directory,
    /// Create an empty file (0644) if nothing exists at the path.
    FileOrCreate,
    /// A regular file must exist at the path.
    File,
    /// A UNIX socket must exist at the path.
    Socket,
    /// A character device must exist at the path.
    CharDevice,
    /// A block device must exist at the path.
    BlockDevice,
    /// No checks are performed.
    #[default]
    Unset,
}

impl HostPathType {
    /// All variants, in manifest documentation order.
    pub const ALL: [HostPathType; 8] = [
        Self::Unset,
        Self::DirectoryOrCreate,
        Self::Directory,
        Self::FileOrCreate,
        Self::File,
        Self::Socket,
        Self::CharDevice,
        Self::BlockDevice,
    ];

    /// The manifest tag for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectoryOrCreate => "DirectoryOrCreate",
            Self::Directory => "Directory",
            Self::FileOrCreate => "FileOrCreate",
            Self::File => "File",
            Self::Socket => "Socket",
            Self::CharDevice => "CharDevice",
            Self::BlockDevice => "BlockDevice",
            Self::Unset => "",
        }
    }

    /// Whether an existing entity in `state` satisfies this type.
    ///
    /// [`HostPathType::Unset`] accepts everything, including absence.
    pub fn accepts(&self, state: PathState) -> bool {
        match self {
            Self::DirectoryOrCreate | Self::Directory => state == PathState::IsDirectory,
            Self::FileOrCreate | Self::File => state == PathState::IsRegularFile,
            Self::Socket => state == PathState::IsSocket,
            Self::CharDevice => state == PathState::IsCharDevice,
            Self::BlockDevice => state == PathState::IsBlockDevice,
            Self::Unset => true,
        }
    }
}

impl fmt::Display for HostPathType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("<unset>"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl FromStr for HostPathType {
    type Err = HostPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| HostPathError::InvalidType(s.to_owned()))
    }
}

impl TryFrom<String> for HostPathType {
    type Error = HostPathError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<HostPathType> for String {
    fn from(t: HostPathType) -> Self {
        t.as_str().to_owned()
    }
}

// ---------------------------------------------------------------------------
// Observed state
// ---------------------------------------------------------------------------

/// What is found at a path after following symbolic links.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PathState {
    Missing,
    IsDirectory,
    IsRegularFile,
    IsSocket,
    IsCharDevice,
    IsBlockDevice,
    /// FIFOs and anything else the host-path types cannot name.
    IsOtherOrUnsupported,
}

impl fmt::Display for PathState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Missing => "missing",
            Self::IsDirectory => "a directory",
            Self::IsRegularFile => "a regular file",
            Self::IsSocket => "a socket",
            Self::IsCharDevice => "a character device",
            Self::IsBlockDevice => "a block device",
            Self::IsOtherOrUnsupported => "an unsupported file type",
        })
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A single path check, built fresh for every mount attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathTypeRequest {
    /// Absolute host path.
    pub path: PathBuf,
    /// Declared type of the entity at `path`.
    pub declared_type: HostPathType,
}

impl PathTypeRequest {
    /// Build a request, rejecting empty and relative paths.
    pub fn new(path: impl Into<PathBuf>, declared_type: HostPathType) -> Result<Self, HostPathError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(HostPathError::InvalidPath {
                path: String::new(),
                reason: "path is empty".into(),
            });
        }
        if !path.is_absolute() {
            return Err(HostPathError::InvalidPath {
                path: path.display().to_string(),
                reason: "path must be absolute".into(),
            });
        }
        Ok(Self {
            path,
            declared_type,
        })
    }
}

/// The `hostPath` volume source as written in a pod manifest.
///
/// ```yaml
/// hostPath:
///   path: /var/lib/app
///   type: DirectoryOrCreate
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HostPathVolumeSource {
    pub path: String,
    /// Missing in the manifest means [`HostPathType::Unset`].
    #[serde(rename = "type", default)]
    pub type_: HostPathType,
}

impl HostPathVolumeSource {
    /// Validate the manifest fields into a [`PathTypeRequest`].
    pub fn to_request(&self) -> Result<PathTypeRequest, HostPathError> {
        PathTypeRequest::new(&self.path, self.type_)
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// The entity a `*OrCreate` type materialized.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CreatedEntity {
    Directory,
    /// An empty regular file.
    File,
}

/// Coarse result of an evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Created,
    Fail,
}

/// Terminal result of evaluating one [`PathTypeRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Decision {
    /// The path satisfies the declared type; mount `resolved_path`.
    Pass {
        resolved_path: PathBuf,
        /// `None` for unset types, which are not inspected.
        state: Option<PathState>,
    },
    /// The path was missing and has been created.
    Created {
        path: PathBuf,
        entity: CreatedEntity,
        mode: u32,
    },
    Fail(HostPathError),
}

impl Decision {
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Pass { .. } => Outcome::Pass,
            Self::Created { .. } => Outcome::Created,
            Self::Fail(_) => Outcome::Fail,
        }
    }

    /// The error carried by a [`Decision::Fail`].
    pub fn error(&self) -> Option<&HostPathError> {
        match self {
            Self::Fail(e) => Some(e),
            _ => None,
        }
    }

    /// The path the orchestrator should bind-mount, if any.
    pub fn mount_source(&self) -> Option<&Path> {
        match self {
            Self::Pass { resolved_path, .. } => Some(resolved_path),
            Self::Created { path, .. } => Some(path),
            Self::Fail(_) => None,
        }
    }

    /// Convert into a `Result` carrying the mount source.
    pub fn into_result(self) -> Result<PathBuf, HostPathError> {
        match self {
            Self::Pass { resolved_path, .. } => Ok(resolved_path),
            Self::Created { path, .. } => Ok(path),
            Self::Fail(e) => Err(e),
        }
    }
}
