//! Turn volume labels and user input into safe single path segments, and
//! vet user-supplied base directories.
use std::path::{Component, Path};

use crate::error::MountError;

/// Replacement for characters that are unsafe in a path segment.
pub const PLACEHOLDER: char = '_';

const fn is_unsafe(c: char) -> bool {
    matches!(c, '/' | '\\' | '"' | '\'' | '`') || c.is_ascii_control()
}

/// Sanitize `raw` into a string usable as one path segment.
///
/// Leading and trailing whitespace is stripped and unsafe characters become
/// [`PLACEHOLDER`]. Pure: no I/O.
///
/// # Errors
///
/// - [`MountError::InvalidPath`] if the input is empty after trimming or
///   would name the current directory.
/// - [`MountError::PathTraversal`] if the input contains `..`.
pub fn sanitize(raw: &str) -> Result<String, MountError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MountError::InvalidPath(raw.to_string()));
    }
    if trimmed.contains("..") {
        return Err(MountError::PathTraversal(raw.to_string()));
    }
    let clean: String = trimmed
        .chars()
        .map(|c| if is_unsafe(c) { PLACEHOLDER } else { c })
        .collect();
    if clean == "." {
        return Err(MountError::InvalidPath(raw.to_string()));
    }
    Ok(clean)
}

/// Accept `path` as a base directory for mount points.
///
/// # Errors
///
/// - [`MountError::InvalidPath`] if `path` is relative.
/// - [`MountError::PathTraversal`] if any component is `..`.
pub fn check_base_dir(path: &Path) -> Result<(), MountError> {
    let shown = || path.display().to_string();
    if path.components().any(|c| c == Component::ParentDir) {
        return Err(MountError::PathTraversal(shown()));
    }
    if !path.is_absolute() {
        return Err(MountError::InvalidPath(shown()));
    }
    Ok(())
}
