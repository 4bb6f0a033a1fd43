//! Member path containment checks.

use std::path::{Component, Path, PathBuf};

use crate::error::{IntakeError, Result};

/// Resolves an archive member name against the destination root.
///
/// The name is normalized component by component: `.` segments drop out,
/// while `..`, root, and prefix components fail with
/// [`IntakeError::PathTraversal`]. Names carrying NUL bytes fail with
/// [`IntakeError::SecurityViolation`]. When the candidate's parent already
/// exists on disk it is canonicalized and re-checked against the root, so a
/// member cannot escape through a directory that resolves outside the
/// scratch tree.
///
/// `dest_root` must be canonical (see [`super::ScratchDir`]).
pub(crate) fn resolve_member_path(dest_root: &Path, raw: &Path) -> Result<PathBuf> {
    if raw.as_os_str().as_encoded_bytes().contains(&0) {
        return Err(IntakeError::SecurityViolation {
            reason: format!("member name {} contains a NUL byte", raw.display()),
        });
    }

    let mut normalized = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(IntakeError::PathTraversal {
                    name: raw.to_path_buf(),
                });
            }
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err(IntakeError::PathTraversal {
            name: raw.to_path_buf(),
        });
    }

    let candidate = dest_root.join(&normalized);
    if let Some(parent) = candidate.parent() {
        if parent.exists() {
            let real = parent.canonicalize()?;
            if !real.starts_with(dest_root) {
                return Err(IntakeError::PathTraversal {
                    name: raw.to_path_buf(),
                });
            }
        }
    }
    Ok(candidate)
}
