//! Host-path error types.
//!
//! Every failed evaluation is represented by a [`HostPathError`], which
//! derives [`thiserror::Error`] and also implements
//! [`Serialize`]/[`Deserialize`] so a decision can be handed to another
//! node-agent component unchanged.  [`ErrorKind`] is the flat taxonomy used
//! by callers that branch on the failure class.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{HostPathType, PathState};

/// Failure class of a [`HostPathError`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Target absent and the declared type does not permit creation.
    PathDoesNotExist,
    /// Target exists but is of a different kind.
    KindMismatch,
    /// The path is a symlink whose target is absent.
    BrokenLink,
    /// The symlink chain loops or is too deep.
    LinkResolutionFailed,
    /// Creating the directory or file failed.
    CreationFailed,
    /// `lstat`/`stat` failed for a reason other than absence.
    InspectionFailed,
    /// The request path is empty or relative.
    InvalidPath,
    /// The type tag is not a known host-path type.
    InvalidType,
    /// The bind mount performed after a successful evaluation failed.
    MountFailed,
}

/// Unified error type for host-path evaluation and set-up.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum HostPathError {
    #[error("hostPath type check failed: {path} does not exist (expected {expected})")]
    PathDoesNotExist {
        path: String,
        expected: HostPathType,
    },

    #[error("hostPath type check failed: {path} is {actual}, expected {expected}")]
    KindMismatch {
        path: String,
        expected: HostPathType,
        actual: PathState,
    },

    /// Creation is refused rather than materializing an entity at either end
    /// of a dangling link.
    #[error("hostPath {path} is a symlink to missing target {target}, refusing to create {expected}")]
    BrokenLink {
        path: String,
        target: String,
        expected: HostPathType,
    },

    #[error("failed to resolve symlinks for {path}: {reason}")]
    LinkResolutionFailed { path: String, reason: String },

    #[error("failed to create {path}: {reason}")]
    CreationFailed { path: String, reason: String },

    #[error("failed to inspect {path}: {reason}")]
    InspectionFailed { path: String, reason: String },

    #[error("invalid hostPath {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid hostPath type {0:?}")]
    InvalidType(String),

    #[error("bind mount {source_path} -> {target}: {reason}")]
    MountFailed {
        source_path: String,
        target: String,
        reason: String,
    },
}

impl HostPathError {
    /// The failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PathDoesNotExist { .. } => ErrorKind::PathDoesNotExist,
            Self::KindMismatch { .. } => ErrorKind::KindMismatch,
            Self::BrokenLink { .. } => ErrorKind::BrokenLink,
            Self::LinkResolutionFailed { .. } => ErrorKind::LinkResolutionFailed,
            Self::CreationFailed { .. } => ErrorKind::CreationFailed,
            Self::InspectionFailed { .. } => ErrorKind::InspectionFailed,
            Self::InvalidPath { .. } => ErrorKind::InvalidPath,
            Self::InvalidType(_) => ErrorKind::InvalidType,
            Self::MountFailed { .. } => ErrorKind::MountFailed,
        }
    }

    /// Create a [`HostPathError::CreationFailed`] from anything that
    /// implements [`std::fmt::Display`].
    pub fn creation<E: std::fmt::Display>(path: &std::path::Path, e: E) -> Self {
        Self::CreationFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    }

    /// Create a [`HostPathError::InspectionFailed`] from anything that
    /// implements [`std::fmt::Display`].
    pub fn inspection<E: std::fmt::Display>(path: &std::path::Path, e: E) -> Self {
        Self::InspectionFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    }
}
