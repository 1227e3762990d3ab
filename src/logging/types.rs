//! Core logging types: volume entries, status, and the [`Log`] trait.
use crate::error::{MountError, Severity};

/// Per-volume result for summary reporting.
#[derive(Debug, Clone)]
pub struct VolumeEntry {
    /// Device path or mount point the entry refers to.
    pub name: String,
    /// Final status of the volume.
    pub status: VolumeStatus,
    /// Optional detail message (mount point, block reason, error).
    pub message: Option<String>,
}

/// Outcome of processing one volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeStatus {
    /// The volume was mounted by this run.
    Mounted,
    /// The volume was already mounted; nothing changed.
    AlreadyMounted,
    /// The volume was unmounted (or was not mounted to begin with).
    Unmounted,
    /// A persistent mount table entry was written.
    Registered,
    /// The volume was left alone because a safety check refused it.
    Blocked,
    /// The volume was skipped (declined, duplicate entry, nothing to do).
    Skipped,
    /// Processing the volume failed.
    Failed,
}

/// Abstraction over logging backends.
///
/// Components log through this trait so tests can observe output without a
/// global subscriber.
pub trait Log: Send + Sync + std::fmt::Debug {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Record a volume result for the summary.
    fn record(&self, name: &str, status: VolumeStatus, message: Option<&str>);

    /// Log `err` at a level matching its severity, followed by its
    /// remediation hint.
    fn report(&self, err: &MountError) {
        let msg = err.to_string();
        match err.severity() {
            Severity::Notice => self.info(&msg),
            Severity::Recoverable => self.warn(&msg),
            Severity::Global | Severity::Device => self.error(&msg),
        }
        if let Some(hint) = err.hint() {
            self.info(&format!("hint: {hint}"));
        }
    }
}
