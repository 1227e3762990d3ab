//! Read-only NTFS health probes: hibernation and dirty state.
use std::fmt;
use std::path::Path;

use crate::error::MountError;
use crate::exec::Executor;

/// `ntfs-3g.probe` exit status for a hibernated volume.
pub const EXIT_HIBERNATED: i32 = 14;

/// `ntfs-3g.probe` exit status for an uncleanly unmounted volume.
pub const EXIT_UNCLEAN: i32 = 15;

/// Health of one device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Health {
    /// The dirty bit is set or the volume needs a consistency check.
    pub dirty: bool,
    /// Windows left the volume hibernated; writing is unsafe.
    pub hibernated: bool,
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.hibernated, self.dirty) {
            (false, false) => write!(f, "clean"),
            (true, false) => write!(f, "hibernated"),
            (false, true) => write!(f, "dirty"),
            (true, true) => write!(f, "hibernated, dirty"),
        }
    }
}

/// Result of `--verify`: the health flags plus the repair tool's report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Parsed health flags.
    pub health: Health,
    /// Text printed by `ntfsfix --no-action`.
    pub report: String,
}

fn mentions_dirty(text: &str) -> bool {
    let text = text.to_ascii_lowercase();
    text.contains("unclean") || text.contains("is dirty") || text.contains("marked dirty")
}

fn mentions_hibernation(text: &str) -> bool {
    text.to_ascii_lowercase().contains("hibernat")
}

/// Probe `device` without writing to it.
///
/// Also returns the check-only repair report so `--verify` can show it.
///
/// # Errors
///
/// Returns [`MountError::Exec`] if a probe tool cannot be started.
pub fn inspect(executor: &dyn Executor, device: &Path) -> Result<VerifyReport, MountError> {
    let dev = device.to_string_lossy();

    let probe = executor
        .run_unchecked("ntfs-3g.probe", &["--readwrite", &dev])
        .map_err(|e| MountError::exec("ntfs-3g.probe", &e))?;
    let check = executor
        .run_unchecked("ntfsfix", &["--no-action", &dev])
        .map_err(|e| MountError::exec("ntfsfix", &e))?;

    let report = format!("{}{}", check.stdout, check.stderr);
    let health = Health {
        hibernated: probe.code == Some(EXIT_HIBERNATED) || mentions_hibernation(&report),
        dirty: probe.code == Some(EXIT_UNCLEAN) || !check.success || mentions_dirty(&report),
    };
    Ok(VerifyReport {
        health,
        report: report.trim().to_string(),
    })
}

/// Probe `device` for hibernation and dirty state.
///
/// # Errors
///
/// Returns [`MountError::Exec`] if a probe tool cannot be started.
pub fn check(executor: &dyn Executor, device: &Path) -> Result<Health, MountError> {
    inspect(executor, device).map(|r| r.health)
}
