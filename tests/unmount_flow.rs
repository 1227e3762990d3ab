#![allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
//! Integration tests for the unmount flow: busy detection, forced
//! override and managed directory cleanup.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::{FakeSystem, ScriptedExecutor, lsblk, ok};
use ntfs_mount::commands::{self, Command};
use ntfs_mount::error::MountError;
use ntfs_mount::logging::VolumeStatus;
use ntfs_mount::ntfs::unmount::{UnmountOutcome, unmount};
use ntfs_mount::ntfs::usage::Holder;
use ntfs_mount::prompt::Confirmation;

fn mounted_games(sys: &FakeSystem) -> PathBuf {
    let mount_point = sys.media().join("Games");
    std::fs::create_dir_all(&mount_point).unwrap();
    sys.set_mounts(&format!(
        "/dev/sdb1 {} fuseblk rw 0 0\n",
        mount_point.display()
    ));
    mount_point
}

fn steam() -> Vec<Holder> {
    vec![Holder {
        pid: 4242,
        command: "steam".into(),
    }]
}

fn executor() -> Arc<ScriptedExecutor> {
    Arc::new(
        ScriptedExecutor::new()
            .script("lsblk", vec![ok(&lsblk(&[("/dev/sdb1", Some("Games"), "U")]))])
            .script("umount", vec![ok("")]),
    )
}

#[test]
fn open_handle_without_force_is_busy() {
    let sys = FakeSystem::new();
    let mount_point = mounted_games(&sys);
    let exec = executor();
    let (ctx, _log) = sys.context(sys.config(), Arc::clone(&exec), steam(), Confirmation::Approved);

    let err = unmount(&ctx, &mount_point, false).unwrap_err();
    assert!(matches!(&err, MountError::MountBusy { holders, .. }
        if holders == &vec!["4242 (steam)".to_string()]));
    assert!(err.hint().unwrap().contains("--force"));
    assert_eq!(exec.count("umount"), 0);
    assert!(mount_point.exists());
}

#[test]
fn open_handle_with_force_proceeds() {
    let sys = FakeSystem::new();
    let mount_point = mounted_games(&sys);
    let exec = executor();
    let (ctx, _log) = sys.context(sys.config(), Arc::clone(&exec), steam(), Confirmation::Declined);

    let outcome = unmount(&ctx, &mount_point, true).unwrap();
    assert_eq!(
        outcome,
        UnmountOutcome::Unmounted {
            mount_point: mount_point.clone(),
            removed_dir: true,
        }
    );
    assert_eq!(
        exec.history().last().unwrap(),
        &format!("umount --lazy {}", mount_point.display())
    );
}

#[test]
fn unmount_all_reports_busy_as_blocked() {
    let sys = FakeSystem::new();
    mounted_games(&sys);
    let exec = executor();
    let (ctx, log) = sys.context(sys.config(), Arc::clone(&exec), steam(), Confirmation::Approved);

    commands::dispatch(&ctx, &log, &Command::Unmount(None)).unwrap();
    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, VolumeStatus::Blocked);
}

#[test]
fn not_mounted_is_success() {
    let sys = FakeSystem::new();
    let exec = executor();
    let (ctx, _log) = sys.context(sys.config(), Arc::clone(&exec), vec![], Confirmation::Approved);
    assert_eq!(
        unmount(&ctx, &PathBuf::from("/dev/sdb1"), false).unwrap(),
        UnmountOutcome::NotMounted
    );
    assert_eq!(exec.count("umount"), 0);
}
