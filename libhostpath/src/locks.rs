//! Per-path serialization for orchestrators that evaluate the same host path
//! from several volumes at once.
//!
//! Locks are keyed by the lexically normalized path, so `/data/./app/` and
//! `/data/app` share a lock.  Symlinks are not resolved for the key: the
//! entity may not exist yet.  An entry lives only while some caller holds or
//! waits on it.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<PathBuf, Arc<Mutex<()>>>;

/// Table of async mutexes, one per normalized path.  Clones share the table.
#[derive(Debug, Default, Clone)]
pub struct PathLocks {
    locks: Arc<LockTable>,
}

/// Exclusive access to one path.  Dropping it releases the lock and removes
/// the table entry if nobody else is queued on it.
#[derive(Debug)]
pub struct PathGuard {
    key: PathBuf,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockTable>,
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold a clone of the mutex, so a count of one is the table's.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl PathLocks {
    /// Wait for exclusive access to `path`.
    pub async fn lock(&self, path: &Path) -> PathGuard {
        let key = normalize(path);
        // Clone out of the map before awaiting so no shard guard is held.
        let lock = self.locks.entry(key.clone()).or_default().clone();
        let guard = lock.lock_owned().await;
        PathGuard {
            key,
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Remove `.` components and trailing separators.  `..` is kept as is.
pub fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn normalize_drops_cur_dir() {
        assert_eq!(normalize(Path::new("/data/./app/")), PathBuf::from("/data/app"));
        assert_eq!(normalize(Path::new("/data//app")), PathBuf::from("/data/app"));
        assert_eq!(normalize(Path::new("/data/../app")), PathBuf::from("/data/../app"));
    }

    #[tokio::test]
    async fn same_path_is_exclusive() {
        let locks = PathLocks::default();
        let guard = locks.lock(Path::new("/data/app")).await;

        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = other.lock(Path::new("/data/./app")).await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn released_entries_are_removed() {
        let locks = PathLocks::default();
        let a = locks.lock(Path::new("/a")).await;
        let b = locks.lock(Path::new("/b")).await;
        assert_eq!(locks.len(), 2);

        drop(a);
        assert_eq!(locks.len(), 1);
        drop(b);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn entry_kept_while_waiter_queued() {
        let locks = PathLocks::default();
        let held = locks.lock(Path::new("/shared")).await;

        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = other.lock(Path::new("/shared")).await;
            other.len()
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(held);
        assert_eq!(waiter.await.unwrap(), 1);
        assert!(locks.is_empty());
    }
}
