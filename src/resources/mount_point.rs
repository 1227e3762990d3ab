//! Mount point directories: derive, create, hand over, probe.
use std::os::unix::fs::{MetadataExt as _, PermissionsExt as _};
use std::path::{Path, PathBuf};

use super::ResourceState;
use super::helpers::fs::{remove_empty_dir, write_probe};
use crate::error::MountError;
use crate::ntfs::device::Device;
use crate::ntfs::mounts::MountTable;
use crate::ntfs::sanitize::{check_base_dir, sanitize};

/// Owner rwx, group and other r-x.
pub const MOUNT_POINT_MODE: u32 = 0o755;

/// A mount point directory owned by the invoking user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPointResource {
    /// Directory path.
    pub path: PathBuf,
    /// `(uid, gid)` the directory must belong to.
    pub owner: (u32, u32),
    /// Permission bits.
    pub mode: u32,
}

impl MountPointResource {
    /// A mount point at `path` owned by `owner` with mode 0755.
    #[must_use]
    pub const fn new(path: PathBuf, owner: (u32, u32)) -> Self {
        Self {
            path,
            owner,
            mode: MOUNT_POINT_MODE,
        }
    }

    fn create_failed(&self, source: std::io::Error) -> MountError {
        MountError::MountPointCreateFailed {
            path: self.path.clone(),
            source,
        }
    }

    /// Create the directory if needed, fix mode and owner, and prove it is
    /// writable. A directory created here is removed again if a later step
    /// fails.
    ///
    /// Returns whether the directory was created by this call.
    ///
    /// # Errors
    ///
    /// - [`MountError::MountPointCreateFailed`] if the directory cannot be
    ///   created or its mode/owner cannot be set.
    /// - [`MountError::MountPointNotWritable`] if the write probe fails.
    pub fn prepare(&self) -> Result<bool, MountError> {
        self.prepare_checked(write_probe)
    }

    fn prepare_checked(
        &self,
        check_writable: impl FnOnce(&Path) -> std::io::Result<()>,
    ) -> Result<bool, MountError> {
        let state = self.inspect();
        if let ResourceState::Invalid { reason } = &state {
            return Err(self.create_failed(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                reason.clone(),
            )));
        }
        let created = state == ResourceState::Missing;
        if created {
            std::fs::create_dir_all(&self.path).map_err(|e| self.create_failed(e))?;
        }

        let result = self.fix_attributes().and_then(|()| {
            check_writable(&self.path).map_err(|e| MountError::MountPointNotWritable {
                path: self.path.clone(),
                reason: e.to_string(),
            })
        });
        if let Err(err) = result {
            if created {
                remove_empty_dir(&self.path).ok();
            }
            return Err(err);
        }
        Ok(created)
    }

    fn fix_attributes(&self) -> Result<(), MountError> {
        std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(self.mode))
            .map_err(|e| self.create_failed(e))?;
        let (uid, gid) = self.owner;
        std::os::unix::fs::chown(&self.path, Some(uid), Some(gid))
            .map_err(|e| self.create_failed(e))
    }

    fn inspect(&self) -> ResourceState {
        let Ok(meta) = std::fs::metadata(&self.path) else {
            return ResourceState::Missing;
        };
        if !meta.is_dir() {
            return ResourceState::Invalid {
                reason: format!("{} exists and is not a directory", self.path.display()),
            };
        }
        let mode = meta.permissions().mode() & 0o7777;
        if mode != self.mode || (meta.uid(), meta.gid()) != self.owner {
            return ResourceState::Incorrect {
                current: format!("{mode:o} {}:{}", meta.uid(), meta.gid()),
            };
        }
        ResourceState::Correct
    }
}

/// A prepared mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMountPoint {
    /// Directory to mount on.
    pub path: PathBuf,
    /// Whether the directory was created by this call.
    pub created: bool,
}

/// Derive the directory name for `device` under `base_dir`.
///
/// Uses the label, or the device name when there is none. If the derived
/// path is already the mount target of another device, `<label>_<devname>`
/// is used instead.
///
/// # Errors
///
/// Returns [`MountError::InvalidLabel`] if the label cannot be sanitized, or
/// the [`check_base_dir`] error if `base_dir` is unsafe.
pub fn derive_path(
    device: &Device,
    base_dir: &Path,
    table: &MountTable,
) -> Result<PathBuf, MountError> {
    let invalid = |e: MountError| MountError::InvalidLabel {
        device: device.path.clone(),
        reason: e.to_string(),
    };
    check_base_dir(base_dir)?;
    let raw = device.label.clone().unwrap_or_else(|| device.name());
    let segment = sanitize(&raw).map_err(invalid)?;
    let path = base_dir.join(&segment);

    let taken = table
        .by_target(&path)
        .is_some_and(|entry| Path::new(&entry.source) != device.path);
    if taken {
        let alternative = sanitize(&format!("{segment}_{}", device.name())).map_err(invalid)?;
        return Ok(base_dir.join(alternative));
    }
    Ok(path)
}

/// Derive, create and validate the mount point for `device`.
///
/// # Errors
///
/// Returns [`MountError::InvalidLabel`], [`MountError::MountPointCreateFailed`]
/// or [`MountError::MountPointNotWritable`].
pub fn resolve(
    device: &Device,
    base_dir: &Path,
    owner: (u32, u32),
    table: &MountTable,
) -> Result<ResolvedMountPoint, MountError> {
    let path = derive_path(device, base_dir, table)?;
    let created = MountPointResource::new(path.clone(), owner).prepare()?;
    Ok(ResolvedMountPoint { path, created })
}
