//! Mount every NTFS volume, or one.
use std::path::Path;

use anyhow::Result;

use super::{failure_status, finish};
use crate::context::Context;
use crate::error::MountError;
use crate::logging::{Log as _, Logger, VolumeStatus};
use crate::ntfs::device::{Device, enumerate, find_device};
use crate::ntfs::mount::{MountOutcome, mount_device};
use crate::ntfs::persist;

/// Mount every NTFS volume, one after another.
///
/// A volume that fails is reported and skipped; the rest are still
/// processed.
///
/// # Errors
///
/// Returns an error if enumeration fails or any volume ended in failure.
/// Finding no NTFS volumes is not an error.
pub fn run_all(ctx: &Context, log: &Logger) -> Result<()> {
    log.stage("Discovering NTFS volumes");
    let devices = match enumerate(ctx.executor.as_ref()) {
        Ok(devices) => devices,
        Err(e @ MountError::NoDevicesFound) => {
            log.report(&e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    log.info(&format!("found {} NTFS volume(s)", devices.len()));

    for device in &devices {
        process(ctx, log, device);
    }
    finish(log, "mount")
}

/// Mount one device.
///
/// # Errors
///
/// Returns [`MountError::DeviceNotFound`] if `device` is not an NTFS block
/// device, or an error if the mount failed.
pub fn run_one(ctx: &Context, log: &Logger, device: &Path) -> Result<()> {
    let device = find_device(ctx.executor.as_ref(), device)?;
    process(ctx, log, &device);
    finish(log, "mount")
}

/// Mount `device`, register it when `--fstab` is set, and record the result.
fn process(ctx: &Context, log: &Logger, device: &Device) {
    let name = device.path.display().to_string();
    log.stage(&format!("Mounting {name}"));

    let outcome = match mount_device(ctx, device) {
        Ok(outcome) => outcome,
        Err(err) => {
            log.report(&err);
            log.record(&name, failure_status(&err), Some(&err.to_string()));
            return;
        }
    };

    let (status, mount_point) = match &outcome {
        MountOutcome::Mounted(record) => {
            log.info(&format!(
                "mounted {name} at {} ({} driver)",
                record.mount_point.display(),
                record.driver.role()
            ));
            (VolumeStatus::Mounted, record.mount_point.clone())
        }
        MountOutcome::AlreadyMounted { mount_point, .. } => {
            (VolumeStatus::AlreadyMounted, mount_point.clone())
        }
    };

    let mut detail = mount_point.display().to_string();
    if ctx.config.fstab {
        match persist::register(ctx, device, &mount_point) {
            Ok(_) => detail.push_str(", registered"),
            Err(err) => log.report(&err),
        }
    }
    log.record(&name, status, Some(&detail));
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::commands::test_helpers::logged_context;
    use crate::exec::test_helpers::{MockExecutor, fail, ok};
    use crate::prompt::Confirmation;
    use crate::resources::fstab::parse_table;
    use std::sync::Arc;

    const LSBLK: &str = r#"{"blockdevices":[
        {"name":"/dev/sdb1","fstype":"ntfs","label":"Games","uuid":"01D9ABCDEF012345","mountpoint":null},
        {"name":"/dev/sdc1","fstype":"ntfs","label":"Backup","uuid":"7A3F12BC3F127E21","mountpoint":null}
    ]}"#;

    /// Two clean volumes; later rules override these.
    fn base() -> MockExecutor {
        MockExecutor::new()
            .on("lsblk", vec![ok(LSBLK)])
            .on("ntfs-3g.probe", vec![ok("")])
            .on("ntfsfix --no-action", vec![ok("")])
            .without("systemctl")
    }

    fn system(exec: MockExecutor) -> (tempfile::TempDir, Arc<MockExecutor>) {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("mounts"), "").unwrap();
        (tmp, Arc::new(exec))
    }

    #[test]
    fn one_failure_does_not_stop_the_rest() {
        let (tmp, exec) = system(
            base()
                .on("ntfs-3g.probe --readwrite /dev/sdb1", vec![fail(14, "")])
                .on("mount", vec![ok("")]),
        );
        let (ctx, log) = logged_context(tmp.path(), exec, Confirmation::Approved);

        run_all(&ctx, &log).unwrap();
        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, VolumeStatus::Blocked);
        assert_eq!(entries[1].status, VolumeStatus::Mounted);
        assert!(tmp.path().join("media/Backup").is_dir());
    }

    #[test]
    fn failed_volume_makes_run_fail() {
        let (tmp, exec) = system(base().on("mount", vec![fail(32, "bad")]));
        let (ctx, log) = logged_context(tmp.path(), exec, Confirmation::Declined);
        let err = run_all(&ctx, &log).unwrap_err();
        assert!(err.to_string().contains("2 volume(s) failed"));
        assert_eq!(log.failure_count(), 2);
    }

    #[test]
    fn no_devices_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = Arc::new(MockExecutor::new().on("lsblk", vec![ok(r#"{"blockdevices":[]}"#)]));
        let (ctx, log) = logged_context(tmp.path(), exec, Confirmation::Approved);
        assert!(run_all(&ctx, &log).is_ok());
        assert!(log.entries().is_empty());
    }

    #[test]
    fn unknown_device_is_an_error() {
        let (tmp, exec) = system(base());
        let (ctx, log) = logged_context(tmp.path(), exec, Confirmation::Approved);
        let err = run_one(&ctx, &log, Path::new("/dev/sdz9")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MountError>(),
            Some(MountError::DeviceNotFound(_))
        ));
    }

    #[test]
    fn fstab_flag_registers_after_mount() {
        let (tmp, exec) = system(base().on("mount", vec![ok("")]));
        let (mut ctx, log) = logged_context(tmp.path(), exec, Confirmation::Approved);
        ctx.config.fstab = true;
        run_one(&ctx, &log, Path::new("sdb1")).unwrap();

        let table = std::fs::read_to_string(tmp.path().join("fstab")).unwrap();
        let entries = parse_table(&table);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mount_point, tmp.path().join("media/Games"));
        assert!(log.entries()[0].message.as_deref().unwrap().ends_with("registered"));
    }
}
