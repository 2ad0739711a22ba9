//! Provisioning configuration.
//!
//! Controls the permission bits given to entities created for
//! `DirectoryOrCreate` and `FileOrCreate`.
//!
//! Environment variables (octal, e.g. `0750`):
//! - `RKL_HOSTPATH_DIR_MODE`: mode for created directories. Defaults to `0755`.
//! - `RKL_HOSTPATH_FILE_MODE`: mode for created files. Defaults to `0644`.
//!
//! Values that do not parse as octal permission bits are ignored and the
//! default is used.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Mode for directories created by `DirectoryOrCreate`.
pub const DEFAULT_DIR_MODE: u32 = 0o755;
/// Mode for files created by `FileOrCreate`.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Settings for the creation step of the provisioner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisionerConfig {
    /// Permission bits for created directories (and any missing parents).
    pub dir_mode: u32,
    /// Permission bits for created files.
    pub file_mode: u32,
    /// Whether `DirectoryOrCreate` creates missing parent directories.
    pub create_parents: bool,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            dir_mode: DEFAULT_DIR_MODE,
            file_mode: DEFAULT_FILE_MODE,
            create_parents: true,
        }
    }
}

impl ProvisionerConfig {
    /// Build a configuration from the `RKL_HOSTPATH_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let mode = |key: &str| get(key).as_deref().and_then(parse_mode);
        Self {
            dir_mode: mode("RKL_HOSTPATH_DIR_MODE").unwrap_or(defaults.dir_mode),
            file_mode: mode("RKL_HOSTPATH_FILE_MODE").unwrap_or(defaults.file_mode),
            ..defaults
        }
    }
}

/// Parse an octal permission string such as `"0755"` or `"755"`.
pub fn parse_mode(s: &str) -> Option<u32> {
    let s = s.trim();
    let digits = s.strip_prefix("0o").unwrap_or(s);
    u32::from_str_radix(digits, 8)
        .ok()
        .filter(|m| *m <= 0o7777)
}

/// Globally initialized provisioning configuration, read from environment
/// variables at first access.
pub static PROVISIONER_CONFIG: LazyLock<ProvisionerConfig> =
    LazyLock::new(ProvisionerConfig::from_env);
