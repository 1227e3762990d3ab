//! Status report: mounted NTFS volumes as a fixed-width table.
use std::path::{Path, PathBuf};

use super::device::{device_path, list_ntfs};
use super::driver::Driver;
use super::mounts::MountTable;
use crate::error::MountError;
use crate::exec::Executor;

/// Shown instead of a table when nothing matches.
pub const EMPTY_MESSAGE: &str = "no mounted NTFS volumes match";

/// One mounted volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    /// Device node.
    pub device: PathBuf,
    /// Volume label.
    pub label: Option<String>,
    /// Driver name (`ntfs3` or `ntfs-3g`), or the raw kernel type.
    pub fstype: String,
    /// Mount target.
    pub mount_point: PathBuf,
}

/// Optional row filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusFilter {
    /// Only this device (`sdb1` or `/dev/sdb1`).
    pub device: Option<PathBuf>,
    /// Only this mount point.
    pub mount_point: Option<PathBuf>,
}

impl StatusFilter {
    fn accepts(&self, row: &StatusRow) -> bool {
        self.device
            .as_deref()
            .is_none_or(|d| device_path(d) == row.device)
            && self
                .mount_point
                .as_deref()
                .is_none_or(|m| m == row.mount_point)
    }
}

/// Join NTFS devices with the kernel mount table at `mounts`.
///
/// # Errors
///
/// Returns an error if `lsblk` fails or the mount table cannot be read.
pub fn collect(
    executor: &dyn Executor,
    mounts: &Path,
    filter: &StatusFilter,
) -> Result<Vec<StatusRow>, MountError> {
    let devices = list_ntfs(executor)?;
    let table = MountTable::read(mounts)?;
    Ok(devices
        .iter()
        .flat_map(|device| {
            table
                .entries()
                .iter()
                .filter(|entry| Path::new(&entry.source) == device.path)
                .map(|entry| StatusRow {
                    device: device.path.clone(),
                    label: device.label.clone(),
                    fstype: Driver::from_fstype(&entry.fstype)
                        .map_or_else(|| entry.fstype.clone(), |d| d.name().to_string()),
                    mount_point: entry.target.clone(),
                })
        })
        .filter(|row| filter.accepts(row))
        .collect())
}

/// Render rows as a fixed-width table with a header line.
#[must_use]
pub fn render(rows: &[StatusRow]) -> String {
    let cells: Vec<[String; 4]> = rows
        .iter()
        .map(|row| {
            [
                row.device.display().to_string(),
                row.label.clone().unwrap_or_else(|| "-".to_string()),
                row.fstype.clone(),
                row.mount_point.display().to_string(),
            ]
        })
        .collect();
    let header = ["DEVICE", "LABEL", "TYPE", "MOUNTPOINT"].map(String::from);

    let mut widths = header.clone().map(|h| h.chars().count());
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    std::iter::once(&header)
        .chain(&cells)
        .map(|line| {
            line.iter()
                .zip(widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The table, or [`EMPTY_MESSAGE`] when there are no rows.
#[must_use]
pub fn report(rows: &[StatusRow]) -> String {
    if rows.is_empty() {
        EMPTY_MESSAGE.to_string()
    } else {
        render(rows)
    }
}
