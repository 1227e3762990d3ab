//! Top-level operations and their dispatch.
//!
//! Flag-based invocation and the interactive menu both build a [`Command`]
//! and hand it to [`dispatch`].
pub mod interactive;
pub mod mount;
pub mod register;
pub mod status;
pub mod unmount;
pub mod verify;

use std::path::PathBuf;

use anyhow::Result;

use crate::context::Context;
use crate::error::MountError;
use crate::logging::{Logger, VolumeStatus};
use crate::ntfs::status::StatusFilter;
use crate::platform::{REQUIRED_TOOLS, STATUS_TOOLS};

/// One operation the tool can perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Mount every NTFS volume.
    MountAll,
    /// Mount a single device.
    MountOne(PathBuf),
    /// Unmount one device or mount point, or every mounted NTFS volume.
    Unmount(Option<PathBuf>),
    /// Confirm, then unmount lazily regardless of holders.
    ForcedUnmount(Option<PathBuf>),
    /// Print mounted volumes.
    Status(StatusFilter),
    /// Run the health checks only.
    Verify(PathBuf),
    /// Mount if needed, then add a persistent mount table entry.
    Register(PathBuf),
    /// Show the numbered menu.
    Interactive,
    /// Print usage.
    Help,
}

impl Command {
    /// Short name for log lines.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MountAll => "mount-all",
            Self::MountOne(_) => "mount",
            Self::Unmount(_) => "unmount",
            Self::ForcedUnmount(_) => "forced-unmount",
            Self::Status(_) => "status",
            Self::Verify(_) => "verify",
            Self::Register(_) => "register",
            Self::Interactive => "interactive",
            Self::Help => "help",
        }
    }

    /// Whether the command touches devices and needs root.
    #[must_use]
    pub const fn needs_root(&self) -> bool {
        !matches!(self, Self::Status(_) | Self::Help)
    }

    /// External tools that must be installed before the command runs.
    #[must_use]
    pub const fn required_tools(&self) -> &'static [&'static str] {
        match self {
            Self::Status(_) => STATUS_TOOLS,
            Self::Help => &[],
            _ => REQUIRED_TOOLS,
        }
    }
}

/// Run `command`.
///
/// Volume results recorded by earlier commands are dropped first, so each
/// summary and failure count covers this command only.
///
/// # Errors
///
/// Returns an error for global failures (unknown device, unreadable system
/// files) and when a volume operation ends in failure.
pub fn dispatch(ctx: &Context, log: &Logger, command: &Command) -> Result<()> {
    log.debug(&format!("running {}", command.name()));
    log.clear_volumes();
    match command {
        Command::MountAll => mount::run_all(ctx, log),
        Command::MountOne(device) => mount::run_one(ctx, log, device),
        Command::Unmount(target) => unmount::run(ctx, log, target.as_deref(), ctx.config.force),
        Command::ForcedUnmount(target) => unmount::run_forced(ctx, log, target.as_deref()),
        Command::Status(filter) => status::run(ctx, filter),
        Command::Verify(device) => verify::run(ctx, device),
        Command::Register(device) => register::run(ctx, log, device),
        Command::Interactive => interactive::run(ctx, log),
        Command::Help => {
            interactive::print_help();
            Ok(())
        }
    }
}

/// Summary status for a failed volume operation.
const fn failure_status(err: &MountError) -> VolumeStatus {
    match err {
        MountError::HibernationBlocked { .. } | MountError::MountBusy { .. } => {
            VolumeStatus::Blocked
        }
        _ => VolumeStatus::Failed,
    }
}

/// Print the summary and fail if any volume failed.
fn finish(log: &Logger, what: &str) -> Result<()> {
    log.print_summary();
    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} volume(s) failed to {what}");
    }
    Ok(())
}
