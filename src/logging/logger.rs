//! Structured logger with per-volume summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::STAGE_TARGET;
use super::types::{Log, VolumeEntry, VolumeStatus};

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger backed by the global [`tracing`] subscriber.
///
/// Every message goes through `tracing`, so the console layer and the
/// rotating audit log (see [`init_subscriber`](super::init_subscriber)) see
/// the same events.
#[derive(Debug)]
pub struct Logger {
    volumes: Mutex<Vec<VolumeEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger.
    ///
    /// `log_file` is only used for display in the run summary; the file is
    /// owned by the subscriber's file layer.
    #[must_use]
    pub const fn new(log_file: Option<PathBuf>) -> Self {
        Self {
            volumes: Mutex::new(Vec::new()),
            log_file,
        }
    }

    /// Return the log file path, if any.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded volume entries.
    #[must_use]
    pub fn entries(&self) -> Vec<VolumeEntry> {
        self.volumes.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless `--debug`; always
    /// written to the audit log).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Record a volume result for the summary.
    pub fn record(&self, name: &str, status: VolumeStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.volumes.lock() {
            guard.push(VolumeEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Forget recorded volumes so the next summary covers only what follows.
    pub fn clear_volumes(&self) {
        if let Ok(mut guard) = self.volumes.lock() {
            guard.clear();
        }
    }

    /// Count the number of failed volumes.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.volumes.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|v| v.status == VolumeStatus::Failed)
                .count()
        })
    }

    /// Print the summary of all recorded volumes.
    pub fn print_summary(&self) {
        let volumes = self.entries();
        if volumes.is_empty() {
            return;
        }

        self.stage("Summary");

        let mut done = 0u32;
        let mut unchanged = 0u32;
        let mut blocked = 0u32;
        let mut failed = 0u32;

        for volume in &volumes {
            let (icon, color) = match volume.status {
                VolumeStatus::Mounted | VolumeStatus::Unmounted | VolumeStatus::Registered => {
                    done += 1;
                    ("✓", "\x1b[32m")
                }
                VolumeStatus::AlreadyMounted | VolumeStatus::Skipped => {
                    unchanged += 1;
                    ("·", "\x1b[2m")
                }
                VolumeStatus::Blocked => {
                    blocked += 1;
                    ("○", "\x1b[33m")
                }
                VolumeStatus::Failed => {
                    failed += 1;
                    ("✗", "\x1b[31m")
                }
            };

            let suffix = volume
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", volume.name));
        }

        let total = done + unchanged + blocked + failed;
        self.info(&format!(
            "{total} volumes: \x1b[32m{done} done\x1b[0m, \x1b[2m{unchanged} unchanged\x1b[0m, \x1b[33m{blocked} blocked\x1b[0m, \x1b[31m{failed} failed\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error);

    fn record(&self, name: &str, status: VolumeStatus, message: Option<&str>) {
        self.record(name, status, message);
    }
}
