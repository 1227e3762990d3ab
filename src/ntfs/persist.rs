//! Persistence registrar: one fstab line per volume, keyed by UUID.
use std::path::Path;

use super::device::{Device, filesystem_uuid};
use crate::context::Context;
use crate::error::MountError;
use crate::resources::fstab::{FstabEntry, FstabResource};

/// Timestamp format of table backups.
pub const BACKUP_STAMP: &str = "%Y%m%d%H%M%S";

/// Register `device` at `mount_point` in the persistent mount table.
///
/// # Errors
///
/// - [`MountError::NoUuid`] if the volume has no filesystem UUID.
/// - [`MountError::DuplicateEntry`] if the mount point or UUID is already
///   registered.
/// - [`MountError::SystemFile`] if the table cannot be backed up or written.
pub fn register(
    ctx: &Context,
    device: &Device,
    mount_point: &Path,
) -> Result<FstabEntry, MountError> {
    let uuid = filesystem_uuid(ctx.executor.as_ref(), device)?;
    let entry = FstabEntry::for_volume(&uuid, mount_point, ctx.config.user.owner());
    let resource = FstabResource::new(ctx.config.paths().fstab.clone(), entry.clone());

    let stamp = chrono::Local::now().format(BACKUP_STAMP).to_string();
    if let Some(backup) = resource.register(&stamp)? {
        ctx.log
            .debug(&format!("previous table saved as {}", backup.display()));
    }
    ctx.log.info(&format!(
        "registered {} in {}",
        entry.spec,
        resource.table.display()
    ));

    reload_units(ctx);
    Ok(entry)
}

fn reload_units(ctx: &Context) {
    if !ctx.executor.which("systemctl") {
        return;
    }
    match ctx.executor.run_unchecked("systemctl", &["daemon-reload"]) {
        Ok(r) if r.success => {}
        Ok(r) => ctx
            .log
            .debug(&format!("systemctl daemon-reload failed: {}", r.message())),
        Err(e) => ctx
            .log
            .debug(&format!("systemctl daemon-reload not run: {e:#}")),
    }
}
