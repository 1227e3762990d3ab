//! System state the orchestrator creates and removes: mount point
//! directories and persistent mount table entries.

pub mod fstab;
pub mod helpers;
pub mod mount_point;

/// How a path on disk compares to the mount point we want there.
///
/// # Examples
///
/// ```
/// use ntfs_mount::resources::ResourceState;
///
/// let loose = ResourceState::Incorrect { current: "700 0:0".into() };
/// assert_ne!(loose, ResourceState::Correct);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Nothing there yet.
    Missing,
    /// Present and as wanted.
    Correct,
    /// Present with the wrong mode or owner.
    Incorrect {
        /// What is there instead.
        current: String,
    },
    /// Unusable, e.g. the path is a regular file.
    Invalid {
        /// Why.
        reason: String,
    },
}
