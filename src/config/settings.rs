//! Optional settings file (`/etc/ntfs-mount/config.toml`).
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::toml_loader::load_config;
use crate::error::MountError;
use crate::logging::rotation::{DEFAULT_BACKUPS, DEFAULT_MAX_BYTES};

/// Settings file read when `--config` is not given.
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/ntfs-mount/config.toml";

/// Which [`ResourceUsageProbe`](crate::ntfs::usage::ResourceUsageProbe) to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyProbeKind {
    /// Native `/proc` scan.
    #[default]
    Procfs,
    /// `fuser -m` adapter.
    Fuser,
}

/// `[log]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    /// Audit log path; defaults to the invoking user's cache directory.
    pub file: Option<PathBuf>,
    /// Rotation threshold in bytes.
    pub max_bytes: u64,
    /// Rotated generations to keep.
    pub backups: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            file: None,
            max_bytes: DEFAULT_MAX_BYTES,
            backups: DEFAULT_BACKUPS,
        }
    }
}

/// `[paths]` section: locations of the system files we read or write.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemPaths {
    /// Persistent mount table.
    pub fstab: PathBuf,
    /// Kernel mount table.
    pub mounts: PathBuf,
    /// procfs root.
    pub proc: PathBuf,
    /// Per-device block statistics directory.
    pub sys_block: PathBuf,
}

impl Default for SystemPaths {
    fn default() -> Self {
        Self {
            fstab: PathBuf::from("/etc/fstab"),
            mounts: PathBuf::from("/proc/self/mounts"),
            proc: PathBuf::from("/proc"),
            sys_block: PathBuf::from("/sys/class/block"),
        }
    }
}

/// Parsed settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Base directory for derived mount points.
    pub mount_dir: Option<PathBuf>,
    /// Program started after every successful mount.
    pub post_mount_hook: Option<PathBuf>,
    /// Busy-check implementation.
    pub busy_probe: BusyProbeKind,
    /// Audit log settings.
    pub log: LogSettings,
    /// System file locations.
    pub paths: SystemPaths,
}

/// Load settings from `path`; a missing file yields defaults.
///
/// # Errors
///
/// Returns [`MountError::Settings`] if the file exists but cannot be read or
/// parsed.
pub fn load_settings(path: &Path) -> Result<Settings, MountError> {
    load_config(path).map_err(|e| MountError::Settings {
        path: path.to_path_buf(),
        message: format!("{e:#}"),
    })
}
