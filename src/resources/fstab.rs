//! Persistent mount table entries keyed by filesystem UUID.
use std::ffi::OsString;
use std::fmt;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::error::MountError;
use crate::ntfs::driver::{Driver, MountOptions};
use crate::ntfs::mounts::{escape_octal, unescape_octal};

/// One non-comment line of fstab(5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FstabEntry {
    /// First field, e.g. `UUID=01D9ABCDEF012345`.
    pub spec: String,
    /// Mount point (unescaped).
    pub mount_point: PathBuf,
    /// Filesystem type.
    pub fstype: String,
    /// Mount options.
    pub options: String,
    /// Dump frequency.
    pub dump: u32,
    /// fsck pass number.
    pub pass: u32,
}

impl FstabEntry {
    /// Entry for an NTFS volume mounted through the fallback driver.
    #[must_use]
    pub fn for_volume(uuid: &str, mount_point: &Path, owner: (u32, u32)) -> Self {
        Self {
            spec: format!("UUID={uuid}"),
            mount_point: mount_point.to_path_buf(),
            fstype: Driver::Fuse.name().to_string(),
            options: MountOptions::new(owner, false).render(Driver::Fuse),
            dump: 0,
            pass: 0,
        }
    }

    /// UUID named by the first field, if it is `UUID=...`.
    #[must_use]
    pub fn uuid(&self) -> Option<&str> {
        self.spec.strip_prefix("UUID=")
    }

    /// Parse one line; comments, blanks and malformed lines yield `None`.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let mut fields = line.split_whitespace();
        let spec = unescape_octal(fields.next()?);
        let mount_point = PathBuf::from(unescape_octal(fields.next()?));
        let fstype = fields.next()?.to_string();
        let options = fields.next().unwrap_or("defaults").to_string();
        let dump = fields.next().and_then(|f| f.parse().ok()).unwrap_or(0);
        let pass = fields.next().and_then(|f| f.parse().ok()).unwrap_or(0);
        Some(Self {
            spec,
            mount_point,
            fstype,
            options,
            dump,
            pass,
        })
    }
}

impl fmt::Display for FstabEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            escape_octal(&self.spec),
            escape_octal(&self.mount_point.to_string_lossy()),
            self.fstype,
            self.options,
            self.dump,
            self.pass
        )
    }
}

/// Parse a whole table.
#[must_use]
pub fn parse_table(content: &str) -> Vec<FstabEntry> {
    content.lines().filter_map(FstabEntry::parse_line).collect()
}

/// `<table>.bak-<stamp>`
#[must_use]
pub fn backup_path(table: &Path, stamp: &str) -> PathBuf {
    let mut name = OsString::from(table.as_os_str());
    name.push(format!(".bak-{stamp}"));
    PathBuf::from(name)
}

/// An entry that must exist in the persistent mount table at `table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FstabResource {
    /// Table file.
    pub table: PathBuf,
    /// Desired entry.
    pub entry: FstabEntry,
}

impl FstabResource {
    /// Desired `entry` in `table`.
    #[must_use]
    pub const fn new(table: PathBuf, entry: FstabEntry) -> Self {
        Self { table, entry }
    }

    fn read_table(&self) -> Result<String, MountError> {
        match std::fs::read_to_string(&self.table) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(MountError::SystemFile {
                path: self.table.clone(),
                source,
            }),
        }
    }

    /// Key of an existing entry sharing our mount point or UUID.
    fn conflict(&self, content: &str) -> Option<String> {
        parse_table(content).into_iter().find_map(|existing| {
            if existing.mount_point == self.entry.mount_point {
                Some(self.entry.mount_point.display().to_string())
            } else if existing.uuid().is_some() && existing.uuid() == self.entry.uuid() {
                Some(self.entry.spec.clone())
            } else {
                None
            }
        })
    }

    /// Back up the table, then append the entry.
    ///
    /// Returns the backup path, or `None` when there was no table to back up.
    ///
    /// # Errors
    ///
    /// - [`MountError::DuplicateEntry`] if the mount point or UUID is
    ///   already present; the table is left untouched.
    /// - [`MountError::SystemFile`] if the table cannot be read, backed up or
    ///   written.
    pub fn register(&self, stamp: &str) -> Result<Option<PathBuf>, MountError> {
        let content = self.read_table()?;
        if let Some(key) = self.conflict(&content) {
            return Err(MountError::DuplicateEntry { key });
        }
        let io_err = |source: std::io::Error| MountError::SystemFile {
            path: self.table.clone(),
            source,
        };

        let backup = if self.table.exists() {
            let backup = backup_path(&self.table, stamp);
            std::fs::copy(&self.table, &backup).map_err(io_err)?;
            Some(backup)
        } else {
            None
        };

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.table)
            .map_err(io_err)?;
        let separator = if content.is_empty() || content.ends_with('\n') {
            ""
        } else {
            "\n"
        };
        writeln!(file, "{separator}{}", self.entry).map_err(io_err)?;
        Ok(backup)
    }
}
