//! hostPath volume set-up.
//!
//! Setting up a hostPath volume for a Pod container is two steps:
//!
//! 1. **Check** — evaluate the declared type, creating the path for the
//!    `*OrCreate` types.
//! 2. **Bind** — bind-mount the resolved path into the container, through
//!    the [`BindMounter`] the node agent provides.
//!
//! A failed check never reaches the mounter.

use std::path::Path;

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::checker::HostPathProvisioner;
use crate::error::HostPathError;
use crate::types::{Decision, HostPathVolumeSource};

/// Bind-mount capability supplied by the environment.
#[async_trait]
pub trait BindMounter: Send + Sync {
    /// Make `source` visible at `target`.
    ///
    /// The returned string is the reason reported in
    /// [`HostPathError::MountFailed`].
    async fn bind_mount(&self, source: &Path, target: &Path, read_only: bool)
    -> Result<(), String>;
}

/// A hostPath volume as declared by one Pod.
#[derive(Debug, Clone)]
pub struct HostPathVolume {
    pub name: String,
    pub source: HostPathVolumeSource,
}

impl HostPathVolume {
    pub fn new(name: impl Into<String>, source: HostPathVolumeSource) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }

    /// Check the host path and bind-mount it at `target`.
    ///
    /// Returns the decision that allowed the mount.  Evaluation runs under
    /// the provisioner's per-path lock, so volumes sharing a host path set
    /// up one at a time.
    #[instrument(skip(self, provisioner, mounter), fields(volume = %self.name, path = %self.source.path))]
    pub async fn set_up<M: BindMounter + ?Sized>(
        &self,
        provisioner: &HostPathProvisioner,
        mounter: &M,
        target: &Path,
        read_only: bool,
    ) -> Result<Decision, HostPathError> {
        let req = self.source.to_request()?;
        let decision = provisioner.evaluate_serialized(req).await;
        let source = decision.clone().into_result()?;

        mounter
            .bind_mount(&source, target, read_only)
            .await
            .map_err(|reason| HostPathError::MountFailed {
                source_path: source.display().to_string(),
                target: target.display().to_string(),
                reason,
            })?;

        info!(
            source = %source.display(),
            target = %target.display(),
            read_only,
            "hostPath volume mounted",
        );
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use crate::error::ErrorKind;
    use crate::types::{HostPathType, Outcome};

    #[derive(Default)]
    struct RecordingMounter {
        mounts: Mutex<Vec<(PathBuf, PathBuf, bool)>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl BindMounter for RecordingMounter {
        async fn bind_mount(
            &self,
            source: &Path,
            target: &Path,
            read_only: bool,
        ) -> Result<(), String> {
            if let Some(reason) = &self.fail_with {
                return Err(reason.clone());
            }
            self.mounts
                .lock()
                .unwrap()
                .push((source.to_path_buf(), target.to_path_buf(), read_only));
            Ok(())
        }
    }

    fn volume(path: &Path, t: HostPathType) -> HostPathVolume {
        HostPathVolume::new(
            "data",
            HostPathVolumeSource {
                path: path.display().to_string(),
                type_: t,
            },
        )
    }

    #[tokio::test]
    async fn creates_then_mounts() {
        let tmp = tempfile::tempdir().unwrap();
        let host = tmp.path().join("app-data");
        let mounter = RecordingMounter::default();
        let provisioner = HostPathProvisioner::default();

        let decision = volume(&host, HostPathType::DirectoryOrCreate)
            .set_up(&provisioner, &mounter, Path::new("/ctr/data"), true)
            .await
            .unwrap();

        assert_eq!(decision.outcome(), Outcome::Created);
        let mounts = mounter.mounts.lock().unwrap();
        assert_eq!(mounts.as_slice(), &[(host, PathBuf::from("/ctr/data"), true)]);
    }

    #[tokio::test]
    async fn symlink_mounts_resolved_target() {
        let tmp = tempfile::tempdir().unwrap();
        let real = tmp.path().join("real");
        std::fs::create_dir(&real).unwrap();
        let link = tmp.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        let mounter = RecordingMounter::default();

        volume(&link, HostPathType::Directory)
            .set_up(&HostPathProvisioner::default(), &mounter, Path::new("/ctr"), false)
            .await
            .unwrap();

        let mounts = mounter.mounts.lock().unwrap();
        assert_eq!(mounts[0].0, std::fs::canonicalize(&real).unwrap());
    }

    #[tokio::test]
    async fn failed_check_does_not_mount() {
        let tmp = tempfile::tempdir().unwrap();
        let mounter = RecordingMounter::default();

        let err = volume(&tmp.path().join("absent"), HostPathType::Directory)
            .set_up(&HostPathProvisioner::default(), &mounter, Path::new("/ctr"), false)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PathDoesNotExist);
        assert!(mounter.mounts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn relative_path_rejected() {
        let mounter = RecordingMounter::default();
        let err = volume(Path::new("var/lib"), HostPathType::Unset)
            .set_up(&HostPathProvisioner::default(), &mounter, Path::new("/ctr"), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPath);
    }

    #[tokio::test]
    async fn mount_failure_is_reported_separately() {
        let mounter = RecordingMounter {
            fail_with: Some("no such file or directory".into()),
            ..Default::default()
        };

        let err = volume(Path::new("/nonexistent/for/test"), HostPathType::Unset)
            .set_up(&HostPathProvisioner::default(), &mounter, Path::new("/ctr"), false)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MountFailed);
        assert!(err.to_string().contains("/nonexistent/for/test"));
    }
}
