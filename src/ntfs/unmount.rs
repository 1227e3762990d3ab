//! Unmount executor: busy check, optional I/O check, detach, tidy up.
use std::path::{Path, PathBuf};

use super::device::device_path;
use super::driver::Driver;
use super::mounts::{MountEntry, MountTable};
use super::usage::io_in_flight;
use crate::context::Context;
use crate::error::MountError;
use crate::logging::Spinner;
use crate::resources::helpers::fs::remove_empty_dir;

/// Result of [`unmount`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnmountOutcome {
    /// The volume was detached.
    Unmounted {
        /// Former mount target.
        mount_point: PathBuf,
        /// Whether the emptied managed directory was removed.
        removed_dir: bool,
    },
    /// Nothing was mounted there.
    NotMounted,
}

/// Find the mount entry for `target`: a mount point, or a device
/// (`/dev/sdb1` or `sdb1`) resolved through the mount table.
#[must_use]
pub fn lookup<'a>(table: &'a MountTable, target: &Path) -> Option<&'a MountEntry> {
    table
        .by_target(target)
        .or_else(|| table.by_source(&device_path(target)))
}

/// Detach whatever is mounted at (or from) `target`.
///
/// Unless `force` is set, a mount point with holders is refused and pending
/// block I/O needs confirmation. A forced unmount detaches lazily.
///
/// # Errors
///
/// - [`MountError::DeviceNotFound`] if `target` is mounted but is not an
///   NTFS volume.
/// - [`MountError::MountBusy`] if processes hold the mount point, or I/O is
///   in flight and the operator did not approve.
/// - [`MountError::UnmountFailed`] if `umount` fails.
/// - [`MountError::SystemFile`] if the mount table cannot be read.
pub fn unmount(
    ctx: &Context,
    target: &Path,
    force: bool,
) -> Result<UnmountOutcome, MountError> {
    let config = &ctx.config;
    let table = MountTable::read(&config.paths().mounts)?;
    let Some(entry) = lookup(&table, target) else {
        ctx.log
            .info(&format!("{} is not mounted", target.display()));
        return Ok(UnmountOutcome::NotMounted);
    };
    if Driver::from_fstype(&entry.fstype).is_none() {
        return Err(MountError::DeviceNotFound(target.to_path_buf()));
    }
    let mount_point = entry.target.clone();

    let holders = ctx.usage.holders(&mount_point)?;
    if !holders.is_empty() {
        let holders: Vec<String> = holders.iter().map(ToString::to_string).collect();
        if !force {
            return Err(MountError::MountBusy {
                mount_point,
                holders,
            });
        }
        ctx.log.warn(&format!(
            "{} is in use by {}; detaching lazily",
            mount_point.display(),
            holders.join(", ")
        ));
    }

    if !force
        && let Some(pending) = io_in_flight(&config.paths().sys_block, Path::new(&entry.source))
        && pending > 0
    {
        let answer = ctx.prompt.confirm(&format!(
            "{} has {pending} I/O requests in flight. Unmount anyway?",
            entry.source
        ));
        if !answer.is_approved() {
            return Err(MountError::MountBusy {
                mount_point,
                holders: vec![format!("{pending} I/O requests in flight")],
            });
        }
    }

    let dir = mount_point.to_string_lossy().into_owned();
    let args = if force {
        vec!["--lazy", dir.as_str()]
    } else {
        vec![dir.as_str()]
    };
    let spinner = Spinner::start(&format!("unmounting {dir}"), ctx.spinner_enabled());
    let result = ctx.executor.run_unchecked("umount", &args);
    drop(spinner);
    let failure = match result {
        Ok(r) if r.success => None,
        Ok(r) => Some(r.message()),
        Err(e) => Some(format!("{e:#}")),
    };
    if let Some(message) = failure {
        return Err(MountError::UnmountFailed {
            mount_point,
            message,
        });
    }

    let removed_dir = config.is_managed(&mount_point)
        && match remove_empty_dir(&mount_point) {
            Ok(removed) => removed,
            Err(e) => {
                ctx.log.debug(&format!(
                    "could not remove {}: {e}",
                    mount_point.display()
                ));
                false
            }
        };
    Ok(UnmountOutcome::Unmounted {
        mount_point,
        removed_dir,
    })
}
