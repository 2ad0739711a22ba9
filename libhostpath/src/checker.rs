//! The host-path type check.
//!
//! [`HostPathProvisioner::evaluate`] inspects a path, compares what it finds
//! against the declared [`HostPathType`] and, for the `*OrCreate` types,
//! creates the missing entity:
//!
//! | Found | `*OrCreate` | `Directory`..`BlockDevice` | `Unset` |
//! |---|---|---|---|
//! | missing | create → `Created` | `PathDoesNotExist` | `Pass` |
//! | broken symlink | `BrokenLink` | `PathDoesNotExist` | `Pass` |
//! | matching kind | `Pass` | `Pass` | `Pass` |
//! | other kind | `KindMismatch` | `KindMismatch` | `Pass` |
//!
//! Evaluation holds no state between calls.  Two concurrent evaluations of
//! the same path are not serialized; see [`crate::locks::PathLocks`] for
//! callers that need that.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::config::{PROVISIONER_CONFIG, ProvisionerConfig};
use crate::error::HostPathError;
use crate::inspect::{Inspection, inspect};
use crate::locks::PathLocks;
use crate::provision::{self, Created};
use crate::types::{CreatedEntity, Decision, HostPathType, PathState, PathTypeRequest};

/// Evaluate `req` with the environment-derived [`PROVISIONER_CONFIG`].
pub fn evaluate(req: &PathTypeRequest) -> Decision {
    check(&PROVISIONER_CONFIG, req)
}

/// Validates host paths and provisions the `*OrCreate` types.
#[derive(Debug, Clone, Default)]
pub struct HostPathProvisioner {
    config: ProvisionerConfig,
    locks: PathLocks,
}

impl HostPathProvisioner {
    pub fn new(config: ProvisionerConfig) -> Self {
        Self {
            config,
            locks: PathLocks::default(),
        }
    }

    /// Check `req.path` against `req.declared_type`, creating it if allowed.
    ///
    /// Exactly one terminal [`Decision`] is returned; errors are never
    /// retried or logged here.
    pub fn evaluate(&self, req: &PathTypeRequest) -> Decision {
        check(&self.config, req)
    }

    /// Like [`Self::evaluate`], but holds the per-path lock until the
    /// blocking evaluation finishes, even if this future is dropped.
    pub async fn evaluate_serialized(&self, req: PathTypeRequest) -> Decision {
        let guard = self.locks.lock(&req.path).await;
        let config = self.config;
        let path = req.path.display().to_string();
        let task = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            check(&config, &req)
        });
        match task.await {
            Ok(decision) => decision,
            Err(e) => Decision::Fail(HostPathError::InspectionFailed {
                path,
                reason: format!("evaluation task failed: {e}"),
            }),
        }
    }
}

#[instrument(skip(config, req), fields(path = %req.path.display(), declared = %req.declared_type))]
fn check(config: &ProvisionerConfig, req: &PathTypeRequest) -> Decision {
    // Unset bypasses validation; the mount step reports whatever is wrong.
    if req.declared_type == HostPathType::Unset {
        return Decision::Pass {
            resolved_path: req.path.clone(),
            state: None,
        };
    }

    match inspect(&req.path) {
        Ok(found) => decide(config, req, found),
        Err(e) => Decision::Fail(e),
    }
}

fn decide(config: &ProvisionerConfig, req: &PathTypeRequest, found: Inspection) -> Decision {
    if found.state != PathState::Missing {
        return compare(req, found);
    }

    let entity = match req.declared_type {
        HostPathType::DirectoryOrCreate => CreatedEntity::Directory,
        HostPathType::FileOrCreate => CreatedEntity::File,
        HostPathType::Directory
        | HostPathType::File
        | HostPathType::Socket
        | HostPathType::CharDevice
        | HostPathType::BlockDevice
        | HostPathType::Unset => {
            return Decision::Fail(HostPathError::PathDoesNotExist {
                path: req.path.display().to_string(),
                expected: req.declared_type,
            });
        }
    };

    if found.is_broken_link() {
        return broken_link(req, &found);
    }

    create(config, req, entity)
}

fn create(config: &ProvisionerConfig, req: &PathTypeRequest, entity: CreatedEntity) -> Decision {
    let created = match entity {
        CreatedEntity::Directory => provision::create_directory(&req.path, config),
        CreatedEntity::File => provision::create_file(&req.path, config),
    };

    match created {
        Ok(Created::New(mode)) => {
            info!(path = %req.path.display(), ?entity, mode = %format!("{mode:o}"), "hostPath created");
            Decision::Created {
                path: req.path.clone(),
                entity,
                mode,
            }
        }
        // Lost a creation race: judge whatever is there now.
        Ok(Created::AlreadyExists) => match inspect(&req.path) {
            Ok(found) if found.is_broken_link() => broken_link(req, &found),
            Ok(found) if found.state != PathState::Missing => compare(req, found),
            Ok(_) => Decision::Fail(HostPathError::creation(
                &req.path,
                "path reported as existing but vanished before re-check",
            )),
            Err(e) => Decision::Fail(e),
        },
        Err(e) => Decision::Fail(e),
    }
}

fn broken_link(req: &PathTypeRequest, found: &Inspection) -> Decision {
    let target = found
        .link_target
        .as_deref()
        .unwrap_or(Path::new(""))
        .display()
        .to_string();
    Decision::Fail(HostPathError::BrokenLink {
        path: req.path.display().to_string(),
        target,
        expected: req.declared_type,
    })
}

/// Compare an existing entity against the declared type.
fn compare(req: &PathTypeRequest, found: Inspection) -> Decision {
    if req.declared_type.accepts(found.state) {
        debug!(path = %req.path.display(), state = %found.state, "hostPath type check passed");
        Decision::Pass {
            resolved_path: found.resolved_path,
            state: Some(found.state),
        }
    } else {
        Decision::Fail(HostPathError::KindMismatch {
            path: req.path.display().to_string(),
            expected: req.declared_type,
            actual: found.state,
        })
    }
}
