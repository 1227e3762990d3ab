#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
//! Integration tests for the mount flow: driver fallback, repair, the
//! hibernation gate, idempotence and the resulting status report.

mod common;

use std::path::Path;
use std::sync::Arc;

use common::{FakeSystem, ScriptedExecutor, fail, lsblk, ok};
use ntfs_mount::commands;
use ntfs_mount::error::MountError;
use ntfs_mount::logging::VolumeStatus;
use ntfs_mount::ntfs::device::find_device;
use ntfs_mount::ntfs::driver::Driver;
use ntfs_mount::ntfs::mount::{MountOutcome, mount_device};
use ntfs_mount::ntfs::status::{StatusFilter, StatusRow, collect};
use ntfs_mount::prompt::Confirmation;

fn games_system() -> ScriptedExecutor {
    ScriptedExecutor::new()
        .script("lsblk", vec![ok(&lsblk(&[("/dev/sdb1", Some("Games"), "01D9ABCDEF012345")]))])
        .script("ntfs-3g.probe", vec![ok("")])
        .script("ntfsfix --no-action", vec![ok("")])
        .script("ntfsfix --clear-dirty", vec![ok("")])
}

// ---------------------------------------------------------------------------
// Example scenario
// ---------------------------------------------------------------------------

/// `/dev/sdb1` labelled `Games`: the kernel driver fails, the FUSE driver
/// succeeds, and status shows the FUSE driver at `<base>/Games`.
#[test]
fn primary_fails_fallback_succeeds_and_status_shows_it() {
    let sys = FakeSystem::new();
    let exec = Arc::new(
        games_system()
            .script("mount -t ntfs3", vec![fail(32, "unknown filesystem type 'ntfs3'")])
            .script("mount -t ntfs-3g", vec![ok("")]),
    );
    let (ctx, _log) = sys.context(
        sys.config(),
        Arc::clone(&exec),
        vec![],
        Confirmation::Approved,
    );

    let device = find_device(exec.as_ref(), Path::new("/dev/sdb1")).unwrap();
    let MountOutcome::Mounted(record) = mount_device(&ctx, &device).unwrap() else {
        panic!("expected a fresh mount");
    };
    let mount_point = sys.media().join("Games");
    assert_eq!(record.mount_point, mount_point);
    assert_eq!(record.driver, Driver::Fuse);
    assert_eq!(exec.count("ntfsfix --clear-dirty"), 0);

    sys.set_mounts(&format!(
        "/dev/sdb1 {} fuseblk rw,user_id=0,group_id=0,allow_other 0 0\n",
        mount_point.display()
    ));
    let rows = collect(
        exec.as_ref(),
        &ctx.config.paths().mounts,
        &StatusFilter::default(),
    )
    .unwrap();
    assert_eq!(
        rows,
        vec![StatusRow {
            device: "/dev/sdb1".into(),
            label: Some("Games".into()),
            fstype: "ntfs-3g".into(),
            mount_point,
        }]
    );
}

// ---------------------------------------------------------------------------
// Fallback chain
// ---------------------------------------------------------------------------

/// Repair runs exactly once, after the fallback failure and before the
/// final FUSE attempt.
#[test]
fn repair_runs_once_before_final_attempt() {
    let sys = FakeSystem::new();
    let exec = Arc::new(
        games_system()
            .script("mount -t ntfs3", vec![fail(32, "")])
            .script("mount -t ntfs-3g", vec![fail(32, "volume is dirty"), ok("")]),
    );
    let (ctx, _log) = sys.context(sys.config(), Arc::clone(&exec), vec![], Confirmation::Approved);

    let device = find_device(exec.as_ref(), Path::new("sdb1")).unwrap();
    mount_device(&ctx, &device).unwrap();

    let history = exec.history();
    let relevant: Vec<String> = history
        .iter()
        .filter(|l| l.starts_with("mount") || l.starts_with("ntfsfix --clear-dirty"))
        .map(|l| l.split_whitespace().take(3).collect::<Vec<_>>().join(" "))
        .collect();
    assert_eq!(
        relevant,
        [
            "mount -t ntfs3",
            "mount -t ntfs-3g",
            "ntfsfix --clear-dirty /dev/sdb1",
            "mount -t ntfs-3g",
        ]
    );
}

// ---------------------------------------------------------------------------
// Hibernation gate
// ---------------------------------------------------------------------------

#[test]
fn hibernated_volume_never_mounts_without_force() {
    let sys = FakeSystem::new();
    let exec = Arc::new(
        games_system()
            .script("ntfs-3g.probe", vec![fail(14, "Windows is hibernated")])
            .script("mount", vec![ok("")]),
    );
    let (ctx, log) = sys.context(sys.config(), Arc::clone(&exec), vec![], Confirmation::Approved);

    commands::dispatch(&ctx, &log, &commands::Command::MountAll).unwrap();
    assert_eq!(exec.count("mount"), 0);
    assert_eq!(log.entries()[0].status, VolumeStatus::Blocked);
    assert!(!sys.media().join("Games").exists());
}

#[test]
fn hibernated_volume_mounts_with_force() {
    let sys = FakeSystem::new();
    let exec = Arc::new(
        games_system()
            .script("ntfs-3g.probe", vec![fail(14, "Windows is hibernated")])
            .script("mount", vec![ok("")]),
    );
    let mut config = sys.config();
    config.force = true;
    let (ctx, _log) = sys.context(config, Arc::clone(&exec), vec![], Confirmation::Declined);

    let device = find_device(exec.as_ref(), Path::new("sdb1")).unwrap();
    let outcome = mount_device(&ctx, &device).unwrap();
    assert!(matches!(outcome, MountOutcome::Mounted(ref r) if r.options.ends_with(",force")));
    assert_eq!(exec.count("mount -t ntfs3"), 1);
}

// ---------------------------------------------------------------------------
// Idempotence
// ---------------------------------------------------------------------------

#[test]
fn mounting_twice_mounts_once() {
    let sys = FakeSystem::new();
    let exec = Arc::new(games_system().script("mount", vec![ok("")]));
    let (ctx, _log) = sys.context(sys.config(), Arc::clone(&exec), vec![], Confirmation::Approved);
    let device = find_device(exec.as_ref(), Path::new("sdb1")).unwrap();

    let first = mount_device(&ctx, &device).unwrap();
    sys.set_mounts(&format!(
        "/dev/sdb1 {} ntfs3 rw 0 0\n",
        first.mount_point().display()
    ));
    let second = mount_device(&ctx, &device).unwrap();

    assert_eq!(second.mount_point(), first.mount_point());
    assert!(matches!(second, MountOutcome::AlreadyMounted { .. }));
    assert_eq!(exec.count("mount"), 1);
    assert_eq!(std::fs::read_dir(sys.media()).unwrap().count(), 1);
}

#[test]
fn unknown_device_is_global_error() {
    let sys = FakeSystem::new();
    let exec = Arc::new(games_system());
    let (ctx, log) = sys.context(sys.config(), exec, vec![], Confirmation::Approved);
    let err = commands::dispatch(&ctx, &log, &commands::Command::MountOne("/dev/sdz1".into()))
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MountError>(),
        Some(MountError::DeviceNotFound(_))
    ));
}
