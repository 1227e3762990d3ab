//! NTFS drivers and the mount option set they share.
use std::fmt;

/// A driver able to mount NTFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Driver {
    /// In-kernel `ntfs3`; tried first.
    Kernel,
    /// User-space `ntfs-3g` (FUSE); the fallback.
    Fuse,
}

impl Driver {
    /// Name passed to `mount -t` and written to the persistent mount table.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Kernel => "ntfs3",
            Self::Fuse => "ntfs-3g",
        }
    }

    /// Position in the fallback chain.
    #[must_use]
    pub const fn role(self) -> &'static str {
        match self {
            Self::Kernel => "primary",
            Self::Fuse => "fallback",
        }
    }

    /// Map a kernel mount table filesystem type back to a driver.
    #[must_use]
    pub fn from_fstype(fstype: &str) -> Option<Self> {
        match fstype {
            "ntfs3" => Some(Self::Kernel),
            "fuseblk" | "ntfs-3g" | "ntfs" => Some(Self::Fuse),
            _ => None,
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options common to every mount: read-write, large writes, Windows-safe
/// names, no access-time updates.
const BASE_OPTIONS: &[&str] = &["rw", "big_writes", "windows_names", "noatime"];

/// FUSE-only options the kernel driver rejects.
const FUSE_ONLY: &[&str] = &["big_writes"];

/// The option set applied to a mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountOptions {
    /// Owner UID mapped onto every file.
    pub uid: u32,
    /// Owner GID mapped onto every file.
    pub gid: u32,
    /// Append the `force` option.
    pub force: bool,
}

impl MountOptions {
    /// Options for the given owner.
    #[must_use]
    pub const fn new((uid, gid): (u32, u32), force: bool) -> Self {
        Self { uid, gid, force }
    }

    /// Render the `-o` string for `driver`.
    #[must_use]
    pub fn render(&self, driver: Driver) -> String {
        let mut options: Vec<String> = BASE_OPTIONS
            .iter()
            .filter(|o| driver == Driver::Fuse || !FUSE_ONLY.contains(*o))
            .map(|o| (*o).to_string())
            .collect();
        options.push(format!("uid={}", self.uid));
        options.push(format!("gid={}", self.gid));
        if self.force {
            options.push("force".to_string());
        }
        options.join(",")
    }
}
