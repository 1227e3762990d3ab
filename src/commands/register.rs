//! Add a volume to the persistent mount table.
use std::path::Path;

use anyhow::Result;

use crate::context::Context;
use crate::error::MountError;
use crate::logging::{Log as _, Logger, VolumeStatus};
use crate::ntfs::device::find_device;
use crate::ntfs::mount::mount_device;
use crate::ntfs::persist;

/// Mount `device` if it is not mounted yet, then register it.
///
/// A duplicate entry is reported and skipped, not an error.
///
/// # Errors
///
/// Returns an error if the device is unknown, cannot be mounted, has no
/// UUID or the table cannot be written.
pub fn run(ctx: &Context, log: &Logger, device: &Path) -> Result<()> {
    let device = find_device(ctx.executor.as_ref(), device)?;
    let name = device.path.display().to_string();
    log.stage(&format!("Registering {name}"));

    let outcome = mount_device(ctx, &device)?;
    match persist::register(ctx, &device, outcome.mount_point()) {
        Ok(entry) => {
            log.record(&name, VolumeStatus::Registered, Some(&entry.spec));
            Ok(())
        }
        Err(err @ MountError::DuplicateEntry { .. }) => {
            log.report(&err);
            log.record(&name, VolumeStatus::Skipped, Some("already registered"));
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
