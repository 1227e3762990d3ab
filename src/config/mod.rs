//! Run configuration: CLI flags merged with the settings file.
pub mod settings;
pub mod toml_loader;

use std::path::{Path, PathBuf};

pub use settings::{BusyProbeKind, DEFAULT_SETTINGS_PATH, Settings, SystemPaths, load_settings};

use crate::error::MountError;
use crate::logging::LogFile;
use crate::ntfs::sanitize::check_base_dir;
use crate::platform::InvokingUser;

/// Everything a component needs to know about this run.
///
/// Built once in `main` and passed down explicitly; nothing reads ambient
/// process state after startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Account that receives ownership of created artifacts.
    pub user: InvokingUser,
    /// Directory under which mount points are derived.
    pub base_dir: PathBuf,
    /// Override hibernation, dirty and busy checks.
    pub force: bool,
    /// Verbose console output.
    pub debug: bool,
    /// Register a persistent mount table entry after each mount.
    pub fstab: bool,
    /// Approve every confirmation prompt.
    pub assume_yes: bool,
    /// Parsed settings file.
    pub settings: Settings,
}

impl Config {
    /// Build a config with defaults for everything but the user and settings.
    #[must_use]
    pub fn new(user: InvokingUser, settings: Settings) -> Self {
        let base_dir = run_media(&user);
        Self {
            user,
            base_dir,
            force: false,
            debug: false,
            fstab: false,
            assume_yes: false,
            settings,
        }
    }

    /// System file locations.
    #[must_use]
    pub const fn paths(&self) -> &SystemPaths {
        &self.settings.paths
    }

    /// Audit log location and rotation policy, owned by the invoking user.
    #[must_use]
    pub fn log_file(&self) -> LogFile {
        let path = self.settings.log.file.clone().unwrap_or_else(|| {
            self.user
                .home
                .join(".cache")
                .join("ntfs-mount")
                .join("ntfs-mount.log")
        });
        LogFile {
            path,
            max_bytes: self.settings.log.max_bytes,
            backups: self.settings.log.backups,
            owner: Some(self.user.owner()),
        }
    }

    /// Whether `path` lies under the managed base directory.
    #[must_use]
    pub fn is_managed(&self, path: &Path) -> bool {
        path != self.base_dir && path.starts_with(&self.base_dir)
    }
}

fn run_media(user: &InvokingUser) -> PathBuf {
    Path::new("/run/media").join(&user.name)
}

/// Base directory: `--mountdir`, then the settings file, then
/// `/run/media/<user>`.
///
/// # Errors
///
/// Returns [`MountError::PathTraversal`] or [`MountError::InvalidPath`] if
/// the chosen directory has a `..` segment or is relative.
pub fn default_base_dir(
    user: &InvokingUser,
    settings: &Settings,
    cli_override: Option<&Path>,
) -> Result<PathBuf, MountError> {
    let base = cli_override
        .map(Path::to_path_buf)
        .or_else(|| settings.mount_dir.clone())
        .unwrap_or_else(|| run_media(user));
    check_base_dir(&base)?;
    Ok(base)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn alice() -> InvokingUser {
        InvokingUser {
            name: "alice".into(),
            uid: 1000,
            gid: 1000,
            home: PathBuf::from("/home/alice"),
        }
    }

    #[test]
    fn default_base_dir_is_run_media() {
        let config = Config::new(alice(), Settings::default());
        assert_eq!(config.base_dir, PathBuf::from("/run/media/alice"));
    }

    #[test]
    fn cli_override_beats_settings() {
        let settings = Settings {
            mount_dir: Some("/mnt/settings".into()),
            ..Settings::default()
        };
        assert_eq!(
            default_base_dir(&alice(), &settings, Some(Path::new("/mnt/cli"))).unwrap(),
            PathBuf::from("/mnt/cli")
        );
        assert_eq!(
            default_base_dir(&alice(), &settings, None).unwrap(),
            PathBuf::from("/mnt/settings")
        );
        assert_eq!(
            default_base_dir(&alice(), &Settings::default(), None).unwrap(),
            PathBuf::from("/run/media/alice")
        );
    }

    #[test]
    fn traversing_base_dir_is_rejected() {
        let err = default_base_dir(
            &alice(),
            &Settings::default(),
            Some(Path::new("/run/media/alice/../../../etc")),
        )
        .unwrap_err();
        assert!(matches!(err, MountError::PathTraversal(_)));

        let settings = Settings {
            mount_dir: Some("relative/media".into()),
            ..Settings::default()
        };
        let err = default_base_dir(&alice(), &settings, None).unwrap_err();
        assert!(matches!(err, MountError::InvalidPath(_)));
    }

    #[test]
    fn log_file_defaults_to_user_cache() {
        let config = Config::new(alice(), Settings::default());
        let log = config.log_file();
        assert_eq!(
            log.path,
            PathBuf::from("/home/alice/.cache/ntfs-mount/ntfs-mount.log")
        );
        assert_eq!(log.owner, Some((1000, 1000)));
    }

    #[test]
    fn managed_paths_are_strictly_below_base() {
        let config = Config::new(alice(), Settings::default());
        assert!(config.is_managed(Path::new("/run/media/alice/Games")));
        assert!(!config.is_managed(Path::new("/run/media/alice")));
        assert!(!config.is_managed(Path::new("/mnt/Games")));
    }
}
