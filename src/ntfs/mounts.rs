//! Kernel mount table (`/proc/self/mounts`) and fstab-style octal escaping.
use std::path::{Path, PathBuf};

use crate::error::MountError;

/// Escape whitespace and backslashes the way fstab(5) and the kernel do.
#[must_use]
pub fn escape_octal(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            ' ' => out.push_str("\\040"),
            '\t' => out.push_str("\\011"),
            '\n' => out.push_str("\\012"),
            '\\' => out.push_str("\\134"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverse [`escape_octal`]; unknown sequences are kept verbatim.
#[must_use]
pub fn unescape_octal(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let digits: String = chars.clone().take(3).collect();
            if digits.len() == 3
                && digits.bytes().all(|b| (b'0'..=b'7').contains(&b))
                && let Ok(byte) = u8::from_str_radix(&digits, 8)
            {
                out.push(char::from(byte));
                chars.nth(2);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// One line of the kernel mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Mounted source, usually a device node.
    pub source: String,
    /// Mount target.
    pub target: PathBuf,
    /// Kernel filesystem type (`ntfs3`, `fuseblk`, ...).
    pub fstype: String,
    /// Mount options as listed by the kernel.
    pub options: String,
}

/// Snapshot of the kernel mount table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountTable {
    entries: Vec<MountEntry>,
}

impl MountTable {
    /// Parse mount table text; malformed lines are skipped.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let source = fields.next()?;
                let target = fields.next()?;
                let fstype = fields.next()?;
                let options = fields.next().unwrap_or_default();
                Some(MountEntry {
                    source: unescape_octal(source),
                    target: PathBuf::from(unescape_octal(target)),
                    fstype: fstype.to_string(),
                    options: options.to_string(),
                })
            })
            .collect();
        Self { entries }
    }

    /// Read and parse the mount table at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`MountError::SystemFile`] if the file cannot be read.
    pub fn read(path: &Path) -> Result<Self, MountError> {
        std::fs::read_to_string(path)
            .map(|content| Self::parse(&content))
            .map_err(|source| MountError::SystemFile {
                path: path.to_path_buf(),
                source,
            })
    }

    /// All entries in table order.
    #[must_use]
    pub fn entries(&self) -> &[MountEntry] {
        &self.entries
    }

    /// First entry whose source is `device`.
    #[must_use]
    pub fn by_source(&self, device: &Path) -> Option<&MountEntry> {
        self.entries
            .iter()
            .find(|e| Path::new(&e.source) == device)
    }

    /// Most recent entry mounted on `target`.
    #[must_use]
    pub fn by_target(&self, target: &Path) -> Option<&MountEntry> {
        self.entries.iter().rev().find(|e| e.target == target)
    }
}
