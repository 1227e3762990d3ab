//! Domain-specific error types for the mount orchestrator.
//!
//! Internal modules return [`MountError`] while command handlers at the CLI
//! boundary convert it to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Severity
//!
//! ```text
//! Global     : abort before any device is touched (privilege, tools, settings)
//! Device     : skip this device, continue with the others
//! Recoverable: the operator may retry (usually with --force)
//! Notice     : informational; nothing went wrong
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// How far an error propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Abort the whole run before any device work.
    Global,
    /// Fatal for the current device only.
    Device,
    /// The operation failed but may succeed when retried with an override.
    Recoverable,
    /// Informational outcome, not a failure.
    Notice,
}

/// Every failure the orchestrator can report.
#[derive(Error, Debug)]
pub enum MountError {
    /// A required external tool is not installed.
    #[error("required tool '{0}' not found in PATH")]
    MissingDependency(String),

    /// The operation needs elevated privileges.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The invoking user does not resolve to an account.
    #[error("unknown user '{0}'")]
    UnknownUser(String),

    /// No NTFS block devices are present.
    #[error("no NTFS devices found")]
    NoDevicesFound,

    /// A specifically requested device is not an NTFS block device.
    #[error("device not found or not NTFS: {}", .0.display())]
    DeviceNotFound(PathBuf),

    /// A path fragment is empty or otherwise unusable.
    #[error("invalid path: '{0}'")]
    InvalidPath(String),

    /// A path fragment contains a parent-directory segment.
    #[error("path traversal rejected: '{0}'")]
    PathTraversal(String),

    /// The volume label could not be turned into a mount directory name.
    #[error("invalid label for {}: {reason}", .device.display())]
    InvalidLabel {
        /// Device whose label was rejected.
        device: PathBuf,
        /// Why the sanitizer rejected it.
        reason: String,
    },

    /// The mount directory could not be created or prepared.
    #[error("cannot create mount point {}: {source}", .path.display())]
    MountPointCreateFailed {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The mount directory failed the write probe.
    #[error("mount point {} is not writable: {reason}", .path.display())]
    MountPointNotWritable {
        /// Directory that failed the probe.
        path: PathBuf,
        /// Description of the probe failure.
        reason: String,
    },

    /// Windows left the volume hibernated; mounting read-write is unsafe.
    #[error("{} is hibernated by Windows", .device.display())]
    HibernationBlocked {
        /// Hibernated device.
        device: PathBuf,
    },

    /// A driver failed to mount the volume.
    #[error("{driver} failed to mount {}: {message}", .device.display())]
    DriverMountFailure {
        /// Device being mounted.
        device: PathBuf,
        /// Driver name (`ntfs3`, `ntfs-3g`).
        driver: String,
        /// Error output of the mount attempt.
        message: String,
    },

    /// The repair tool failed.
    #[error("repair of {} failed: {message}", .device.display())]
    RepairFailure {
        /// Device being repaired.
        device: PathBuf,
        /// Error output of the repair tool.
        message: String,
    },

    /// Processes or pending I/O still reference the mount point.
    #[error("{} is busy ({})", .mount_point.display(), .holders.join(", "))]
    MountBusy {
        /// Busy mount point.
        mount_point: PathBuf,
        /// Human-readable descriptions of whatever holds it.
        holders: Vec<String>,
    },

    /// The persistent mount table already has a matching entry.
    #[error("persistent mount table already has an entry for {key}")]
    DuplicateEntry {
        /// Mount point or `UUID=` spec that collided.
        key: String,
    },

    /// The filesystem UUID could not be determined.
    #[error("no filesystem UUID for {}", .device.display())]
    NoUuid {
        /// Device without a UUID.
        device: PathBuf,
    },

    /// The unmount command failed.
    #[error("failed to unmount {}: {message}", .mount_point.display())]
    UnmountFailed {
        /// Mount point that stayed mounted.
        mount_point: PathBuf,
        /// Error output of `umount`.
        message: String,
    },

    /// The settings file could not be read or parsed.
    #[error("invalid settings file {}: {message}", .path.display())]
    Settings {
        /// Settings file path.
        path: PathBuf,
        /// Parse or I/O error description.
        message: String,
    },

    /// A system file (mount table, fstab, procfs entry) could not be accessed.
    #[error("cannot access {}: {source}", .path.display())]
    SystemFile {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An external command could not be run at all.
    #[error("failed to run {program}: {message}")]
    Exec {
        /// Program that could not be started or whose output was unusable.
        program: String,
        /// Error description.
        message: String,
    },
}

impl MountError {
    /// Wrap an executor failure for `program`.
    #[must_use]
    pub fn exec(program: &str, err: &anyhow::Error) -> Self {
        Self::Exec {
            program: program.to_string(),
            message: format!("{err:#}"),
        }
    }

    /// Classify how far this error propagates.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::MissingDependency(_)
            | Self::PermissionDenied(_)
            | Self::UnknownUser(_)
            | Self::DeviceNotFound(_)
            | Self::Settings { .. }
            | Self::SystemFile { .. } => Severity::Global,
            Self::InvalidPath(_)
            | Self::PathTraversal(_)
            | Self::InvalidLabel { .. }
            | Self::MountPointCreateFailed { .. }
            | Self::MountPointNotWritable { .. }
            | Self::NoUuid { .. }
            | Self::UnmountFailed { .. }
            | Self::Exec { .. } => Severity::Device,
            Self::HibernationBlocked { .. }
            | Self::DriverMountFailure { .. }
            | Self::RepairFailure { .. }
            | Self::MountBusy { .. } => Severity::Recoverable,
            Self::NoDevicesFound | Self::DuplicateEntry { .. } => Severity::Notice,
        }
    }

    /// Remediation hint shown next to the error.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingDependency(_) => {
                Some("install util-linux and ntfs-3g (pacman -S util-linux ntfs-3g)")
            }
            Self::PermissionDenied(_) => Some("run with sudo"),
            Self::UnknownUser(_) => Some("pass an existing account with --user"),
            Self::NoDevicesFound => Some("connect an NTFS drive and try again"),
            Self::DeviceNotFound(_) => Some("list candidates with `lsblk -f`"),
            Self::InvalidPath(_) | Self::PathTraversal(_) | Self::InvalidLabel { .. } => {
                Some("relabel the volume or mount it with --device and --mountdir")
            }
            Self::MountPointCreateFailed { .. } | Self::MountPointNotWritable { .. } => {
                Some("choose another base directory with --mountdir")
            }
            Self::HibernationBlocked { .. } => Some(
                "boot Windows and shut it down fully (disable Fast Startup), or use --force to override",
            ),
            Self::DriverMountFailure { .. } => {
                Some("run --verify on the device, or use --force to override")
            }
            Self::RepairFailure { .. } => Some("run chkdsk /f from Windows"),
            Self::MountBusy { .. } => {
                Some("close the listed programs, or use --force to detach lazily")
            }
            Self::DuplicateEntry { .. } => Some("edit /etc/fstab by hand to change the entry"),
            Self::NoUuid { .. } => Some("the volume may be damaged; run --verify"),
            Self::UnmountFailed { .. } => Some("use --force to detach lazily"),
            Self::Settings { .. } => Some("fix or remove the settings file"),
            Self::SystemFile { .. } | Self::Exec { .. } => None,
        }
    }
}
