//! File-system resource helpers.
use std::io;
use std::path::Path;

/// Name of the file used to prove a directory is writable.
const PROBE_NAME: &str = ".ntfs-mount-probe";

/// Best-effort ownership change; an unprivileged run cannot chown anyway.
pub fn hand_over(path: &Path, owner: Option<(u32, u32)>) {
    if let Some((uid, gid)) = owner {
        std::os::unix::fs::chown(path, Some(uid), Some(gid)).ok();
    }
}

/// Create and remove a probe file inside `dir`.
///
/// # Errors
///
/// Returns the I/O error of whichever step failed.
pub fn write_probe(dir: &Path) -> io::Result<()> {
    let probe = dir.join(PROBE_NAME);
    std::fs::write(&probe, b"")?;
    std::fs::remove_file(&probe)
}

/// Remove `dir` if it exists and is empty.
///
/// Returns `Ok(true)` when the directory was removed, `Ok(false)` when it was
/// missing or not empty.
///
/// # Errors
///
/// Returns an error if the directory cannot be read or removed.
pub fn remove_empty_dir(dir: &Path) -> io::Result<bool> {
    if !dir.is_dir() {
        return Ok(false);
    }
    if std::fs::read_dir(dir)?.next().is_some() {
        return Ok(false);
    }
    std::fs::remove_dir(dir)?;
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn probe_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        write_probe(dir.path()).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn probe_fails_in_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_probe(&dir.path().join("absent")).is_err());
    }

    #[test]
    fn removes_only_empty_directories() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty");
        let full = dir.path().join("full");
        std::fs::create_dir(&empty).unwrap();
        std::fs::create_dir(&full).unwrap();
        std::fs::write(full.join("file"), b"x").unwrap();

        assert!(remove_empty_dir(&empty).unwrap());
        assert!(!empty.exists());
        assert!(!remove_empty_dir(&full).unwrap());
        assert!(full.exists());
        assert!(!remove_empty_dir(&dir.path().join("missing")).unwrap());
    }

    #[test]
    fn hand_over_to_self_keeps_owner() {
        use std::os::unix::fs::MetadataExt as _;
        let dir = tempfile::tempdir().unwrap();
        let meta = std::fs::metadata(dir.path()).unwrap();
        hand_over(dir.path(), Some((meta.uid(), meta.gid())));
        assert_eq!(std::fs::metadata(dir.path()).unwrap().uid(), meta.uid());
    }
}
