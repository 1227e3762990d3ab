//! Busy detection: which processes hold a mount point, and pending block I/O.
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use procfs::ProcResult;
use procfs::process::{FDTarget, Process, all_processes_with_root};

use crate::config::BusyProbeKind;
use crate::error::MountError;
use crate::exec::Executor;

/// A process referencing a mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holder {
    /// Process id.
    pub pid: u32,
    /// Short command name from `/proc/<pid>/comm`.
    pub command: String,
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.pid, self.command)
    }
}

/// Enumerates processes that keep a mount point busy.
#[cfg_attr(test, mockall::automock)]
pub trait ResourceUsageProbe: Send + Sync {
    /// Processes with a working directory, root, executable or open file at
    /// or below `mount_point`.
    ///
    /// # Errors
    ///
    /// Returns an error if the process list itself cannot be obtained.
    fn holders(&self, mount_point: &Path) -> Result<Vec<Holder>, MountError>;
}

fn command_name(proc_root: &Path, pid: u32) -> String {
    std::fs::read_to_string(proc_root.join(pid.to_string()).join("comm"))
        .map(|c| c.trim().to_string())
        .ok()
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "?".to_string())
}

/// Native scanner over `/proc/<pid>/{cwd,root,exe,fd/*}`.
#[derive(Debug, Clone)]
pub struct ProcfsProbe {
    proc_root: PathBuf,
}

impl ProcfsProbe {
    /// Scan the procfs mounted at `proc_root`.
    #[must_use]
    pub const fn new(proc_root: PathBuf) -> Self {
        Self { proc_root }
    }
}

/// Whether `process` has its working directory, root, executable or an
/// open file at or below `mount_point`. Unreadable entries (exited
/// processes, other users' fds) count as not referencing it.
fn references(process: &Process, mount_point: &Path) -> bool {
    let inside = |path: ProcResult<PathBuf>| path.is_ok_and(|p| p.starts_with(mount_point));
    if inside(process.cwd()) || inside(process.root()) || inside(process.exe()) {
        return true;
    }
    process.fd().is_ok_and(|mut fds| {
        fds.any(|fd| {
            fd.is_ok_and(|info| {
                matches!(&info.target, FDTarget::Path(p) if p.starts_with(mount_point))
            })
        })
    })
}

impl ResourceUsageProbe for ProcfsProbe {
    fn holders(&self, mount_point: &Path) -> Result<Vec<Holder>, MountError> {
        let processes = all_processes_with_root(&self.proc_root).map_err(|e| {
            MountError::SystemFile {
                path: self.proc_root.clone(),
                source: std::io::Error::other(e.to_string()),
            }
        })?;
        let mut holders: Vec<Holder> = processes
            .filter_map(Result::ok)
            .filter(|process| references(process, mount_point))
            .filter_map(|process| {
                let pid = u32::try_from(process.pid).ok()?;
                Some(Holder {
                    pid,
                    command: command_name(&self.proc_root, pid),
                })
            })
            .collect();
        holders.sort_by_key(|h| h.pid);
        Ok(holders)
    }
}

/// Adapter over `fuser -m`.
#[derive(Debug, Clone)]
pub struct FuserProbe {
    executor: Arc<dyn Executor>,
    proc_root: PathBuf,
}

impl FuserProbe {
    /// Use `executor` to run `fuser`; command names come from `proc_root`.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>, proc_root: PathBuf) -> Self {
        Self {
            executor,
            proc_root,
        }
    }
}

/// Parse the PID list `fuser` prints on stdout (`  1234c  5678`).
fn parse_fuser_pids(stdout: &str) -> Vec<u32> {
    let mut pids: Vec<u32> = stdout
        .split_whitespace()
        .filter_map(|token| {
            token
                .trim_end_matches(|c: char| c.is_ascii_alphabetic())
                .parse()
                .ok()
        })
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}

impl ResourceUsageProbe for FuserProbe {
    fn holders(&self, mount_point: &Path) -> Result<Vec<Holder>, MountError> {
        let target = mount_point.to_string_lossy();
        // fuser exits 1 when nothing holds the target.
        let result = self
            .executor
            .run_unchecked("fuser", &["-m", &target])
            .map_err(|e| MountError::exec("fuser", &e))?;
        Ok(parse_fuser_pids(&result.stdout)
            .into_iter()
            .map(|pid| Holder {
                pid,
                command: command_name(&self.proc_root, pid),
            })
            .collect())
    }
}

/// Build the probe selected in the settings file.
#[must_use]
pub fn build_probe(
    kind: BusyProbeKind,
    executor: Arc<dyn Executor>,
    proc_root: &Path,
) -> Arc<dyn ResourceUsageProbe> {
    match kind {
        BusyProbeKind::Procfs => Arc::new(ProcfsProbe::new(proc_root.to_path_buf())),
        BusyProbeKind::Fuser => Arc::new(FuserProbe::new(executor, proc_root.to_path_buf())),
    }
}

/// Requests in flight on `device`, from `<sys_block>/<name>/inflight`.
///
/// Returns `None` when the statistics are unavailable.
#[must_use]
pub fn io_in_flight(sys_block: &Path, device: &Path) -> Option<u64> {
    let name = device.file_name()?;
    let content = std::fs::read_to_string(sys_block.join(name).join("inflight")).ok()?;
    content
        .split_whitespace()
        .map(str::parse::<u64>)
        .try_fold(0u64, |acc, n| n.ok().map(|n| acc.saturating_add(n)))
}
