//! NTFS block device discovery through `lsblk`.
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::MountError;
use crate::exec::Executor;

/// Arguments for a flat, full-path JSON listing.
const LSBLK_ARGS: &[&str] = &["-J", "-p", "-l", "-o", "NAME,FSTYPE,LABEL,UUID,MOUNTPOINT"];

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    #[serde(default)]
    blockdevices: Vec<LsblkEntry>,
}

#[derive(Debug, Deserialize)]
struct LsblkEntry {
    name: String,
    fstype: Option<String>,
    label: Option<String>,
    uuid: Option<String>,
    mountpoint: Option<String>,
}

/// A block device carrying an NTFS filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Device node, e.g. `/dev/sdb1`.
    pub path: PathBuf,
    /// Filesystem UUID, stable across reboots.
    pub uuid: Option<String>,
    /// Volume label.
    pub label: Option<String>,
    /// Filesystem type as reported by `lsblk`.
    pub fstype: String,
    /// Current mount target, if mounted.
    pub mountpoint: Option<PathBuf>,
}

impl Device {
    /// A device known only by its path.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            uuid: None,
            label: None,
            fstype: "ntfs".to_string(),
            mountpoint: None,
        }
    }

    /// Base name of the device node (`sdb1`).
    #[must_use]
    pub fn name(&self) -> String {
        self.path.file_name().map_or_else(
            || self.path.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        )
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn is_ntfs(fstype: &str) -> bool {
    fstype.eq_ignore_ascii_case("ntfs") || fstype.eq_ignore_ascii_case("ntfs3")
}

/// Parse `lsblk -J` output, keeping NTFS entries only.
///
/// # Errors
///
/// Returns [`MountError::Exec`] if the output is not valid `lsblk` JSON.
pub fn parse_lsblk(json: &str) -> Result<Vec<Device>, MountError> {
    let output: LsblkOutput = serde_json::from_str(json).map_err(|e| MountError::Exec {
        program: "lsblk".to_string(),
        message: format!("unexpected output: {e}"),
    })?;
    Ok(output
        .blockdevices
        .into_iter()
        .filter_map(|entry| {
            let fstype = entry.fstype.filter(|f| is_ntfs(f))?;
            Some(Device {
                path: PathBuf::from(entry.name),
                uuid: non_empty(entry.uuid),
                label: non_empty(entry.label),
                fstype,
                mountpoint: non_empty(entry.mountpoint).map(PathBuf::from),
            })
        })
        .collect())
}

/// List every NTFS block device; may be empty.
///
/// # Errors
///
/// Returns [`MountError::Exec`] if `lsblk` cannot run or its output is
/// unusable.
pub fn list_ntfs(executor: &dyn Executor) -> Result<Vec<Device>, MountError> {
    let result = executor
        .run("lsblk", LSBLK_ARGS)
        .map_err(|e| MountError::exec("lsblk", &e))?;
    parse_lsblk(&result.stdout)
}

/// List every NTFS block device, failing when there are none.
///
/// # Errors
///
/// Returns [`MountError::NoDevicesFound`] for an empty list, or any error
/// from [`list_ntfs`].
pub fn enumerate(executor: &dyn Executor) -> Result<Vec<Device>, MountError> {
    let devices = list_ntfs(executor)?;
    if devices.is_empty() {
        return Err(MountError::NoDevicesFound);
    }
    Ok(devices)
}

/// Normalize `sdb1` to `/dev/sdb1`; absolute paths pass through.
#[must_use]
pub fn device_path(input: &Path) -> PathBuf {
    if input.is_absolute() {
        input.to_path_buf()
    } else {
        Path::new("/dev").join(input)
    }
}

/// Find one specific NTFS device.
///
/// # Errors
///
/// Returns [`MountError::DeviceNotFound`] if `path` is not an NTFS block
/// device, or any error from [`list_ntfs`].
pub fn find_device(executor: &dyn Executor, path: &Path) -> Result<Device, MountError> {
    let wanted = device_path(path);
    list_ntfs(executor)?
        .into_iter()
        .find(|d| d.path == wanted)
        .ok_or(MountError::DeviceNotFound(wanted))
}

/// Filesystem UUID of `device`: `lsblk` metadata, then `blkid`.
///
/// # Errors
///
/// Returns [`MountError::NoUuid`] if neither source knows a UUID.
pub fn filesystem_uuid(executor: &dyn Executor, device: &Device) -> Result<String, MountError> {
    if let Some(uuid) = &device.uuid {
        return Ok(uuid.clone());
    }
    let path = device.path.to_string_lossy();
    executor
        .run("blkid", &["-s", "UUID", "-o", "value", &path])
        .ok()
        .map(|r| r.stdout.trim().to_string())
        .filter(|uuid| !uuid.is_empty())
        .ok_or_else(|| MountError::NoUuid {
            device: device.path.clone(),
        })
}
