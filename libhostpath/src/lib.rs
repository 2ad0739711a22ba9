//! # libhostpath — hostPath type checking for RK8s nodes
//!
//! Before the node agent bind-mounts a host directory, file or device into a
//! Pod container it checks that the host path holds what the manifest's
//! `hostPath.type` declares, and creates it for `DirectoryOrCreate` /
//! `FileOrCreate`.  `libhostpath` implements that check and follows the RK8s
//! conventions (`tracing` for observability, `thiserror` for structured
//! errors, Tokio for the async set-up path).
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | Data model: `HostPathType`, `PathState`, `PathTypeRequest`, `Decision`. |
//! | [`error`] | [`HostPathError`] and its [`ErrorKind`] taxonomy. |
//! | [`config`] | Creation modes, read from `RKL_HOSTPATH_*`. |
//! | [`inspect`] | Symlink resolution and path classification. |
//! | [`provision`] | Atomic directory / empty file creation. |
//! | [`checker`] | [`HostPathProvisioner`] — the type-check state machine. |
//! | [`locks`] | Optional per-path serialization. |
//! | [`volume`] | [`BindMounter`] seam and [`HostPathVolume::set_up`]. |

pub mod checker;
pub mod config;
pub mod error;
pub mod inspect;
pub mod locks;
pub mod provision;
pub mod types;
pub mod volume;

// Re-export the most commonly used items at crate root for convenience.
pub use checker::{HostPathProvisioner, evaluate};
pub use config::ProvisionerConfig;
pub use error::{ErrorKind, HostPathError};
pub use volume::{BindMounter, HostPathVolume};
pub use types::*;
