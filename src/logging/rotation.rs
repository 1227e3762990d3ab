//! Size-based rotation for the audit log.
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use crate::resources::helpers::fs::hand_over;

/// Rotate once the active log would grow past this many bytes.
pub const DEFAULT_MAX_BYTES: u64 = 1024 * 1024;

/// Number of rotated generations kept next to the active log.
pub const DEFAULT_BACKUPS: usize = 5;

/// Where the audit log lives and how it rotates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    /// Active log file.
    pub path: PathBuf,
    /// Size threshold in bytes.
    pub max_bytes: u64,
    /// Rotated generations to keep (`log.1` … `log.N`).
    pub backups: usize,
    /// `(uid, gid)` the log directory and files are handed to.
    pub owner: Option<(u32, u32)>,
}

impl LogFile {
    /// A log at `path` with the default rotation policy and no owner change.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self {
            path,
            max_bytes: DEFAULT_MAX_BYTES,
            backups: DEFAULT_BACKUPS,
            owner: None,
        }
    }
}

/// Append-only file that rotates itself when it exceeds its size threshold.
///
/// This is the only place that knows the rotation policy; every writer goes
/// through [`RotatingFile::write_line`].
#[derive(Debug)]
pub struct RotatingFile {
    spec: LogFile,
    file: File,
    size: u64,
}

impl RotatingFile {
    /// Open (or create) the active log, creating its directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn open(spec: LogFile) -> io::Result<Self> {
        if let Some(parent) = spec.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
            hand_over(parent, spec.owner);
        }
        let file = open_append(&spec.path, spec.owner)?;
        let size = file.metadata()?.len();
        Ok(Self { spec, file, size })
    }

    /// Path of the active log.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.spec.path
    }

    /// Append one line, rotating first if the line would cross the threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if rotation or the write fails.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let len = u64::try_from(line.len()).unwrap_or(u64::MAX).saturating_add(1);
        if self.size > 0 && self.size.saturating_add(len) > self.spec.max_bytes {
            self.rotate()?;
        }
        writeln!(self.file, "{line}")?;
        self.size = self.size.saturating_add(len);
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.spec.backups == 0 {
            self.file = OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(&self.spec.path)?;
            self.size = 0;
            return Ok(());
        }
        for generation in (1..self.spec.backups).rev() {
            let from = backup_path(&self.spec.path, generation);
            if from.exists() {
                fs::rename(&from, backup_path(&self.spec.path, generation + 1))?;
            }
        }
        fs::rename(&self.spec.path, backup_path(&self.spec.path, 1))?;
        self.file = open_append(&self.spec.path, self.spec.owner)?;
        self.size = 0;
        Ok(())
    }
}

/// `<path>.<generation>`
#[must_use]
pub fn backup_path(path: &Path, generation: usize) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{generation}"));
    PathBuf::from(name)
}

fn open_append(path: &Path, owner: Option<(u32, u32)>) -> io::Result<File> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    hand_over(path, owner);
    Ok(file)
}
