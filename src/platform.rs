//! Host facts: who invoked us, whether we run privileged, which tools exist.
use std::fmt;
use std::path::PathBuf;

use nix::unistd::{User, geteuid};

use crate::error::MountError;
use crate::exec::Executor;

/// Tools every mutating operation needs.
pub const REQUIRED_TOOLS: &[&str] = &[
    "lsblk",
    "blkid",
    "mount",
    "umount",
    "ntfsfix",
    "ntfs-3g",
    "ntfs-3g.probe",
];

/// Tools the read-only status report needs.
pub const STATUS_TOOLS: &[&str] = &["lsblk"];

/// The non-privileged account created artifacts are handed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokingUser {
    /// Login name.
    pub name: String,
    /// Numeric user id.
    pub uid: u32,
    /// Primary group id.
    pub gid: u32,
    /// Home directory.
    pub home: PathBuf,
}

impl InvokingUser {
    /// `(uid, gid)` pair used for `chown`.
    #[must_use]
    pub const fn owner(&self) -> (u32, u32) {
        (self.uid, self.gid)
    }
}

impl fmt::Display for InvokingUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.name, self.uid, self.gid)
    }
}

impl From<User> for InvokingUser {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
            home: user.dir,
        }
    }
}

/// Look `name` up in the user database (NSS, so LDAP and systemd-homed
/// accounts resolve too).
///
/// # Errors
///
/// Returns [`MountError::UnknownUser`] if the lookup fails or finds nothing.
pub fn lookup_user(name: &str) -> Result<InvokingUser, MountError> {
    User::from_name(name)
        .ok()
        .flatten()
        .map(InvokingUser::from)
        .ok_or_else(|| MountError::UnknownUser(name.to_string()))
}

/// First non-blank candidate: explicit override, then `SUDO_USER`, then
/// `USER`.
fn pick_name<'a>(
    explicit: Option<&'a str>,
    sudo_user: Option<&'a str>,
    user: Option<&'a str>,
) -> Option<&'a str> {
    [explicit, sudo_user, user]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|n| !n.is_empty())
}

/// Pick the invoking user: explicit override, then `SUDO_USER`, then `USER`.
///
/// The environment values are passed in so callers (and tests) control them.
///
/// # Errors
///
/// Returns [`MountError::UnknownUser`] if no candidate name exists or the
/// chosen name does not resolve.
pub fn resolve_user(
    explicit: Option<&str>,
    sudo_user: Option<&str>,
    user: Option<&str>,
) -> Result<InvokingUser, MountError> {
    let name = pick_name(explicit, sudo_user, user)
        .ok_or_else(|| MountError::UnknownUser(String::new()))?;
    lookup_user(name)
}

/// Fail unless the process runs with effective UID 0.
///
/// # Errors
///
/// Returns [`MountError::PermissionDenied`] when not privileged.
pub fn require_root(operation: &str) -> Result<(), MountError> {
    if geteuid().is_root() {
        Ok(())
    } else {
        Err(MountError::PermissionDenied(format!(
            "{operation} requires root"
        )))
    }
}

/// Verify every tool in `tools` is on `PATH`.
///
/// # Errors
///
/// Returns [`MountError::MissingDependency`] naming the first missing tool.
pub fn check_dependencies(executor: &dyn Executor, tools: &[&str]) -> Result<(), MountError> {
    tools
        .iter()
        .find(|tool| !executor.which(tool))
        .map_or(Ok(()), |tool| {
            Err(MountError::MissingDependency((*tool).to_string()))
        })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::MockExecutor;
    use nix::unistd::getuid;

    #[test]
    fn lookup_finds_root() {
        let user = lookup_user("root").unwrap();
        assert_eq!(user.owner(), (0, 0));
        assert_eq!(user.to_string(), "root (0:0)");
    }

    #[test]
    fn lookup_unknown_user_fails() {
        let err = lookup_user("no-such-user-ntfs-mount").unwrap_err();
        assert!(matches!(err, MountError::UnknownUser(n) if n == "no-such-user-ntfs-mount"));
    }

    #[test]
    fn lookup_current_user_by_name() {
        let me = User::from_uid(getuid()).unwrap().unwrap();
        let user = lookup_user(&me.name).unwrap();
        assert_eq!(user.uid, getuid().as_raw());
        assert_eq!(user.home, me.dir);
    }

    #[test]
    fn explicit_user_wins() {
        assert_eq!(pick_name(Some("bob"), Some("alice"), Some("root")), Some("bob"));
    }

    #[test]
    fn sudo_user_before_user() {
        assert_eq!(pick_name(None, Some("alice"), Some("root")), Some("alice"));
    }

    #[test]
    fn blank_candidates_are_skipped() {
        assert_eq!(pick_name(Some("  "), Some(""), Some("root")), Some("root"));
        let user = resolve_user(None, Some(""), Some("root")).unwrap();
        assert_eq!(user.uid, 0);
    }

    #[test]
    fn no_candidate_is_unknown_user() {
        assert!(matches!(
            resolve_user(None, None, None),
            Err(MountError::UnknownUser(n)) if n.is_empty()
        ));
    }

    #[test]
    fn require_root_follows_effective_uid() {
        let result = require_root("mount");
        if geteuid().is_root() {
            assert!(result.is_ok());
        } else {
            assert!(matches!(result, Err(MountError::PermissionDenied(m)) if m == "mount requires root"));
        }
    }

    #[test]
    fn missing_tool_is_reported() {
        let exec = MockExecutor::new().without("ntfsfix");
        let err = check_dependencies(&exec, REQUIRED_TOOLS).unwrap_err();
        assert!(matches!(err, MountError::MissingDependency(t) if t == "ntfsfix"));
    }

    #[test]
    fn all_tools_present() {
        let exec = MockExecutor::new();
        assert!(check_dependencies(&exec, REQUIRED_TOOLS).is_ok());
    }
}
