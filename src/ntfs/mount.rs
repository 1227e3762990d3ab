//! Mount executor: health gate, driver fallback chain and a single repair.
//!
//! ```text
//! Unmounted → Probing → MountAttemptPrimary ─ok→ Mounted
//!                           │ retryable
//!                           ▼
//!                       MountAttemptFallback ─ok→ Mounted
//!                           │ retryable (not forced)
//!                           ▼
//!                       RepairAttempt → MountAttemptFinal ─ok→ Mounted
//!                                            │
//!                                            ▼
//!                                          Failed
//! ```
//!
//! The chain is an ordered list of [`Strategy`] values; each mount attempt
//! yields an [`AttemptOutcome`] and the first success or fatal failure ends
//! the walk.
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::device::Device;
use super::driver::{Driver, MountOptions};
use super::health;
use super::mounts::MountTable;
use crate::context::Context;
use crate::error::MountError;
use crate::logging::Spinner;
use crate::prompt::Confirmation;
use crate::resources::helpers::fs::remove_empty_dir;
use crate::resources::mount_point;

/// Exit status of `mount` for incorrect invocation or missing permissions.
const MOUNT_EXIT_USAGE: i32 = 1;

/// Lifecycle of one mount call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    /// Nothing attempted yet.
    Unmounted,
    /// Health checks running.
    Probing,
    /// Kernel driver attempt.
    MountAttemptPrimary,
    /// FUSE driver attempt.
    MountAttemptFallback,
    /// Filesystem repair.
    RepairAttempt,
    /// FUSE driver retry after repair.
    MountAttemptFinal,
    /// The volume is mounted.
    Mounted,
    /// Every attempt was exhausted or a gate refused.
    Failed,
}

impl fmt::Display for MountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unmounted => "unmounted",
            Self::Probing => "probing",
            Self::MountAttemptPrimary => "primary attempt",
            Self::MountAttemptFallback => "fallback attempt",
            Self::RepairAttempt => "repair",
            Self::MountAttemptFinal => "final attempt",
            Self::Mounted => "mounted",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One named step of the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Run `mount` with `driver`, entering `state`.
    Mount {
        /// Driver to use.
        driver: Driver,
        /// State entered while attempting.
        state: MountState,
    },
    /// Clear the dirty flag (skipped if a repair already ran).
    Repair,
}

/// Tagged result of one mount attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The volume is now mounted.
    Mounted,
    /// This attempt failed; later strategies may still succeed.
    Retryable(MountError),
    /// Stop the chain.
    Fatal(MountError),
}

/// The ordered strategy list: kernel, FUSE, then (unless forced) repair
/// and one more FUSE attempt.
#[must_use]
pub fn plan(force: bool) -> Vec<Strategy> {
    let mut steps = vec![
        Strategy::Mount {
            driver: Driver::Kernel,
            state: MountState::MountAttemptPrimary,
        },
        Strategy::Mount {
            driver: Driver::Fuse,
            state: MountState::MountAttemptFallback,
        },
    ];
    if !force {
        steps.push(Strategy::Repair);
        steps.push(Strategy::Mount {
            driver: Driver::Fuse,
            state: MountState::MountAttemptFinal,
        });
    }
    steps
}

/// A successful mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRecord {
    /// Mounted device.
    pub device: PathBuf,
    /// Where it is mounted.
    pub mount_point: PathBuf,
    /// Driver that succeeded.
    pub driver: Driver,
    /// Rendered `-o` string.
    pub options: String,
    /// When the mount succeeded.
    pub mounted_at: DateTime<Utc>,
}

/// Result of [`mount_device`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountOutcome {
    /// This call mounted the volume.
    Mounted(MountRecord),
    /// The volume was already mounted; nothing changed.
    AlreadyMounted {
        /// Existing mount target.
        mount_point: PathBuf,
        /// Driver inferred from the kernel filesystem type.
        driver: Option<Driver>,
    },
}

impl MountOutcome {
    /// Mount point of the volume either way.
    #[must_use]
    pub fn mount_point(&self) -> &Path {
        match self {
            Self::Mounted(record) => &record.mount_point,
            Self::AlreadyMounted { mount_point, .. } => mount_point,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RepairStatus {
    NotTried,
    Done,
    Declined,
}

/// State machine for one device.
#[derive(Debug)]
struct MountRun<'a> {
    ctx: &'a Context,
    device: &'a Device,
    state: MountState,
    history: Vec<MountState>,
    repair: RepairStatus,
}

impl<'a> MountRun<'a> {
    fn new(ctx: &'a Context, device: &'a Device) -> Self {
        Self {
            ctx,
            device,
            state: MountState::Unmounted,
            history: vec![MountState::Unmounted],
            repair: RepairStatus::NotTried,
        }
    }

    fn dev(&self) -> String {
        self.device.path.display().to_string()
    }

    fn enter(&mut self, next: MountState) {
        self.ctx
            .log
            .debug(&format!("{}: {} -> {next}", self.dev(), self.state));
        self.state = next;
        self.history.push(next);
    }

    fn execute(&mut self) -> Result<MountOutcome, MountError> {
        let ctx = self.ctx;
        let config = &ctx.config;
        let table = MountTable::read(&config.paths().mounts)?;
        if let Some(entry) = table.by_source(&self.device.path) {
            self.ctx.log.warn(&format!(
                "{} is already mounted at {}",
                self.dev(),
                entry.target.display()
            ));
            return Ok(MountOutcome::AlreadyMounted {
                mount_point: entry.target.clone(),
                driver: Driver::from_fstype(&entry.fstype),
            });
        }

        self.enter(MountState::Probing);
        let health = health::check(self.ctx.executor.as_ref(), &self.device.path)
            .inspect_err(|_| self.enter(MountState::Failed))?;
        self.ctx
            .log
            .debug(&format!("{}: health {health}", self.dev()));
        if health.hibernated {
            if !config.force {
                self.enter(MountState::Failed);
                return Err(MountError::HibernationBlocked {
                    device: self.device.path.clone(),
                });
            }
            self.ctx.log.warn(&format!(
                "{} is hibernated; mounting anyway because of --force",
                self.dev()
            ));
        }
        if health.dirty && !config.force {
            self.ctx
                .log
                .warn(&format!("{} is dirty; repairing first", self.dev()));
            self.run_repair();
        }

        let resolved = mount_point::resolve(
            self.device,
            &config.base_dir,
            config.user.owner(),
            &table,
        )
        .inspect_err(|_| self.enter(MountState::Failed))?;
        let options = MountOptions::new(config.user.owner(), config.force);

        let mut last_error = None;
        for step in plan(config.force) {
            match step {
                Strategy::Repair => match self.repair {
                    RepairStatus::Done => {}
                    RepairStatus::Declined => break,
                    RepairStatus::NotTried => {
                        self.enter(MountState::RepairAttempt);
                        if !self.run_repair() {
                            break;
                        }
                    }
                },
                Strategy::Mount { driver, state } => {
                    self.enter(state);
                    match self.attempt(driver, &options, &resolved.path) {
                        AttemptOutcome::Mounted => {
                            self.enter(MountState::Mounted);
                            let record = MountRecord {
                                device: self.device.path.clone(),
                                mount_point: resolved.path,
                                driver,
                                options: options.render(driver),
                                mounted_at: Utc::now(),
                            };
                            self.run_hook(&record);
                            return Ok(MountOutcome::Mounted(record));
                        }
                        AttemptOutcome::Retryable(err) => {
                            self.ctx.log.warn(&err.to_string());
                            last_error = Some(err);
                        }
                        AttemptOutcome::Fatal(err) => {
                            last_error = Some(err);
                            break;
                        }
                    }
                }
            }
        }

        self.enter(MountState::Failed);
        if resolved.created && remove_empty_dir(&resolved.path).unwrap_or(false) {
            self.ctx.log.debug(&format!(
                "removed unused mount point {}",
                resolved.path.display()
            ));
        }
        Err(last_error.unwrap_or_else(|| MountError::DriverMountFailure {
            device: self.device.path.clone(),
            driver: Driver::Fuse.name().to_string(),
            message: "no mount attempt succeeded".to_string(),
        }))
    }

    fn attempt(&self, driver: Driver, options: &MountOptions, target: &Path) -> AttemptOutcome {
        let dev = self.dev();
        let opts = options.render(driver);
        let dir = target.to_string_lossy();
        self.ctx.log.debug(&format!(
            "mount -t {driver} -o {opts} {dev} {dir} ({})",
            driver.role()
        ));
        let spinner = Spinner::start(
            &format!("mounting {dev} with {driver}"),
            self.ctx.spinner_enabled(),
        );
        let result = self
            .ctx
            .executor
            .run_unchecked("mount", &["-t", driver.name(), "-o", &opts, &dev, &dir]);
        drop(spinner);

        match result {
            Err(e) => AttemptOutcome::Fatal(MountError::exec("mount", &e)),
            Ok(r) if r.success => AttemptOutcome::Mounted,
            Ok(r) => {
                let err = MountError::DriverMountFailure {
                    device: self.device.path.clone(),
                    driver: driver.name().to_string(),
                    message: r.message(),
                };
                if r.code == Some(MOUNT_EXIT_USAGE) {
                    AttemptOutcome::Fatal(err)
                } else {
                    AttemptOutcome::Retryable(err)
                }
            }
        }
    }

    /// Ask, then clear the dirty flag. Returns `false` if the operator did
    /// not approve.
    fn run_repair(&mut self) -> bool {
        let dev = self.dev();
        let answer = self
            .ctx
            .prompt
            .confirm(&format!("Run ntfsfix to repair {dev}?"));
        if answer != Confirmation::Approved {
            let why = if answer == Confirmation::Declined {
                "declined"
            } else {
                "no terminal to confirm; use --yes"
            };
            self.ctx
                .log
                .warn(&format!("repair of {dev} skipped ({why})"));
            self.repair = RepairStatus::Declined;
            return false;
        }

        self.repair = RepairStatus::Done;
        let spinner = Spinner::start(&format!("repairing {dev}"), self.ctx.spinner_enabled());
        let result = self
            .ctx
            .executor
            .run_unchecked("ntfsfix", &["--clear-dirty", &dev]);
        drop(spinner);
        let failure = match result {
            Ok(r) if r.success => None,
            Ok(r) => Some(r.message()),
            Err(e) => Some(format!("{e:#}")),
        };
        match failure {
            None => self.ctx.log.info(&format!("repaired {dev}")),
            Some(message) => self.ctx.log.report(&MountError::RepairFailure {
                device: self.device.path.clone(),
                message,
            }),
        }
        true
    }

    fn run_hook(&self, record: &MountRecord) {
        let Some(hook) = &self.ctx.config.settings.post_mount_hook else {
            return;
        };
        let hook = hook.to_string_lossy();
        let dev = record.device.to_string_lossy();
        let dir = record.mount_point.to_string_lossy();
        if let Err(e) = self.ctx.executor.spawn_detached(&hook, &[&dev, &dir]) {
            self.ctx
                .log
                .debug(&format!("post-mount hook {hook} not started: {e:#}"));
        }
    }
}

/// Mount `device` under the configured base directory.
///
/// Idempotent: an already mounted device is reported, never mounted twice.
///
/// # Errors
///
/// Returns the gate error ([`MountError::HibernationBlocked`]), a mount point
/// error, or the last [`MountError::DriverMountFailure`] once every strategy
/// is exhausted.
pub fn mount_device(ctx: &Context, device: &Device) -> Result<MountOutcome, MountError> {
    MountRun::new(ctx, device).execute()
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::context::test_helpers::{context, probe_with};
    use crate::exec::test_helpers::{MockExecutor, fail, ok};
    use std::sync::Arc;

    const CLEAN: &str = "NTFS partition /dev/sdb1 was processed successfully.";

    fn games() -> Device {
        Device {
            label: Some("Games".into()),
            ..Device::from_path("/dev/sdb1")
        }
    }

    fn healthy() -> MockExecutor {
        MockExecutor::new()
            .on("ntfs-3g.probe", vec![ok("")])
            .on("ntfsfix --no-action", vec![ok(CLEAN)])
            .on("ntfsfix --clear-dirty", vec![ok("")])
    }

    fn setup(
        exec: MockExecutor,
        answer: Confirmation,
    ) -> (tempfile::TempDir, Arc<MockExecutor>, Context) {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("mounts"), "").unwrap();
        let exec = Arc::new(exec);
        let ctx = context(tmp.path(), Arc::clone(&exec), probe_with(vec![]), answer);
        (tmp, exec, ctx)
    }

    fn run(ctx: &Context, device: &Device) -> (Result<MountOutcome, MountError>, Vec<MountState>) {
        let mut machine = MountRun::new(ctx, device);
        let result = machine.execute();
        (result, machine.history)
    }

    // ------------------------------------------------------------------
    // Strategy plan
    // ------------------------------------------------------------------

    #[test]
    fn plan_orders_kernel_before_fuse() {
        let steps = plan(false);
        assert_eq!(steps.len(), 4);
        assert!(matches!(
            steps[0],
            Strategy::Mount {
                driver: Driver::Kernel,
                ..
            }
        ));
        assert_eq!(steps[2], Strategy::Repair);
    }

    #[test]
    fn forced_plan_has_no_repair() {
        assert!(!plan(true).contains(&Strategy::Repair));
    }

    // ------------------------------------------------------------------
    // Mount chain
    // ------------------------------------------------------------------

    #[test]
    fn primary_success() {
        let (tmp, exec, ctx) = setup(
            healthy().on("mount -t ntfs3", vec![ok("")]),
            Confirmation::Approved,
        );
        let (result, history) = run(&ctx, &games());
        let MountOutcome::Mounted(record) = result.unwrap() else {
            panic!("expected a fresh mount");
        };
        assert_eq!(record.driver, Driver::Kernel);
        assert_eq!(record.mount_point, tmp.path().join("media/Games"));
        assert_eq!(exec.count("mount -t ntfs-3g"), 0);
        assert_eq!(
            history,
            vec![
                MountState::Unmounted,
                MountState::Probing,
                MountState::MountAttemptPrimary,
                MountState::Mounted
            ]
        );
    }

    #[test]
    fn fallback_used_when_primary_fails() {
        let (_tmp, exec, ctx) = setup(
            healthy()
                .on("mount -t ntfs3", vec![fail(32, "wrong fs type")])
                .on("mount -t ntfs-3g", vec![ok("")]),
            Confirmation::Approved,
        );
        let (result, _) = run(&ctx, &games());
        let MountOutcome::Mounted(record) = result.unwrap() else {
            panic!("expected a fresh mount");
        };
        assert_eq!(record.driver, Driver::Fuse);
        assert!(record.options.contains("big_writes"));
        assert_eq!(exec.count("ntfsfix --clear-dirty"), 0);
    }

    #[test]
    fn repair_runs_once_before_final_attempt() {
        let (_tmp, exec, ctx) = setup(
            healthy()
                .on("mount -t ntfs3", vec![fail(32, "")])
                .on("mount -t ntfs-3g", vec![fail(32, "dirty"), ok("")]),
            Confirmation::Approved,
        );
        let (result, history) = run(&ctx, &games());
        assert!(result.is_ok());
        assert_eq!(exec.count("ntfsfix --clear-dirty"), 1);
        let calls = exec.calls();
        let repair = calls
            .iter()
            .position(|c| c.starts_with("ntfsfix --clear-dirty"))
            .unwrap();
        let last_mount = calls.iter().rposition(|c| c.starts_with("mount")).unwrap();
        assert!(repair < last_mount, "repair must precede the final attempt");
        assert!(history.contains(&MountState::MountAttemptFinal));
    }

    #[test]
    fn dirty_volume_is_repaired_once_up_front() {
        let exec = MockExecutor::new()
            .on("ntfs-3g.probe", vec![fail(15, "")])
            .on("ntfsfix --no-action", vec![ok(CLEAN)])
            .on("ntfsfix --clear-dirty", vec![ok("")])
            .on("mount", vec![fail(32, "still failing")]);
        let (_tmp, exec, ctx) = setup(exec, Confirmation::Approved);
        let (result, history) = run(&ctx, &games());
        assert!(matches!(
            result,
            Err(MountError::DriverMountFailure { .. })
        ));
        assert_eq!(exec.count("ntfsfix --clear-dirty"), 1);
        assert!(!history.contains(&MountState::RepairAttempt));
        assert_eq!(exec.count("mount"), 3);
    }

    #[test]
    fn exhausted_chain_fails_and_cleans_up() {
        let (tmp, exec, ctx) = setup(
            healthy().on("mount", vec![fail(32, "no luck")]),
            Confirmation::Approved,
        );
        let (result, history) = run(&ctx, &games());
        let err = result.unwrap_err();
        assert!(matches!(&err, MountError::DriverMountFailure { driver, message, .. }
            if driver == "ntfs-3g" && message == "no luck"));
        assert_eq!(history.last(), Some(&MountState::Failed));
        assert_eq!(exec.count("mount"), 3);
        assert!(!tmp.path().join("media/Games").exists());
    }

    #[test]
    fn usage_error_is_fatal() {
        let (_tmp, exec, ctx) = setup(
            healthy().on("mount -t ntfs3", vec![fail(1, "only root can do that")]),
            Confirmation::Approved,
        );
        let (result, _) = run(&ctx, &games());
        assert!(result.is_err());
        assert_eq!(exec.count("mount"), 1);
    }

    #[test]
    fn declined_repair_stops_chain() {
        let (_tmp, exec, ctx) = setup(
            healthy().on("mount", vec![fail(32, "")]),
            Confirmation::Declined,
        );
        let (result, _) = run(&ctx, &games());
        assert!(result.is_err());
        assert_eq!(exec.count("ntfsfix --clear-dirty"), 0);
        assert_eq!(exec.count("mount"), 2);
    }

    #[test]
    fn repair_failure_does_not_abort_final_attempt() {
        let (_tmp, exec, ctx) = setup(
            healthy()
                .on("ntfsfix --clear-dirty", vec![fail(1, "cannot repair")])
                .on("mount -t ntfs3", vec![fail(32, "")])
                .on("mount -t ntfs-3g", vec![fail(32, ""), ok("")]),
            Confirmation::Approved,
        );
        let (result, _) = run(&ctx, &games());
        assert!(result.is_ok());
        assert_eq!(exec.count("mount -t ntfs-3g"), 2);
    }

    // ------------------------------------------------------------------
    // Gates
    // ------------------------------------------------------------------

    #[test]
    fn hibernated_volume_is_blocked() {
        let (tmp, exec, ctx) = setup(
            healthy()
                .on("ntfs-3g.probe", vec![fail(14, "hibernated")])
                .on("mount", vec![ok("")]),
            Confirmation::Approved,
        );
        let (result, history) = run(&ctx, &games());
        assert!(matches!(result, Err(MountError::HibernationBlocked { .. })));
        assert!(!history.contains(&MountState::Mounted));
        assert_eq!(exec.count("mount"), 0);
        assert!(!tmp.path().join("media/Games").exists());
    }

    #[test]
    fn hibernated_volume_mounts_with_force() {
        let (_tmp, exec, mut ctx) = setup(
            MockExecutor::new()
                .on("ntfs-3g.probe", vec![fail(14, "")])
                .on("ntfsfix --no-action", vec![ok(CLEAN)])
                .on("mount -t ntfs3", vec![ok("")]),
            Confirmation::Approved,
        );
        ctx.config.force = true;
        let (result, _) = run(&ctx, &games());
        let MountOutcome::Mounted(record) = result.unwrap() else {
            panic!("expected a fresh mount");
        };
        assert!(record.options.ends_with(",force"));
        assert_eq!(exec.count("mount -t ntfs3"), 1);
    }

    #[test]
    fn already_mounted_is_a_no_op() {
        let (tmp, exec, ctx) = setup(healthy(), Confirmation::Approved);
        std::fs::write(
            tmp.path().join("mounts"),
            "/dev/sdb1 /run/media/alice/Games fuseblk rw 0 0\n",
        )
        .unwrap();
        let first = mount_device(&ctx, &games()).unwrap();
        let second = mount_device(&ctx, &games()).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            MountOutcome::AlreadyMounted {
                mount_point: PathBuf::from("/run/media/alice/Games"),
                driver: Some(Driver::Fuse),
            }
        );
        assert_eq!(exec.count("mount"), 0);
        assert!(!tmp.path().join("media").exists());
    }

    // ------------------------------------------------------------------
    // Hook
    // ------------------------------------------------------------------

    #[test]
    fn hook_receives_device_and_mount_point() {
        let (tmp, exec, mut ctx) = setup(
            healthy().on("mount -t ntfs3", vec![ok("")]),
            Confirmation::Approved,
        );
        ctx.config.settings.post_mount_hook = Some(PathBuf::from("/usr/local/bin/notify"));
        mount_device(&ctx, &games()).unwrap();
        assert_eq!(
            exec.spawned(),
            vec![format!(
                "/usr/local/bin/notify /dev/sdb1 {}",
                tmp.path().join("media/Games").display()
            )]
        );
    }
}
