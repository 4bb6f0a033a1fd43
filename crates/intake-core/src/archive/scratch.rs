//! Scratch directory ownership for extraction output.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::Result;

/// Temporary directory holding extracted members.
///
/// The directory is removed when this guard drops, so a failed extraction
/// never leaves orphaned scratch space behind. Callers that want the files
/// to outlive the guard call [`ScratchDir::release`].
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
    root: PathBuf,
}

impl ScratchDir {
    /// Creates a fresh scratch directory under the system temp root.
    ///
    /// The root is canonicalized once here so member containment checks can
    /// compare against a symlink-free prefix.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("intake-").tempdir()?;
        let root = dir.path().canonicalize()?;
        Ok(Self { dir, root })
    }

    /// Canonical root of the scratch tree.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Keeps the directory on disk and returns its canonical root.
    #[must_use]
    pub fn release(self) -> PathBuf {
        let _ = self.dir.keep();
        self.root
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_on_drop() {
        let scratch = ScratchDir::new().unwrap();
        let root = scratch.path().to_path_buf();
        std::fs::write(root.join("member.txt"), b"data").unwrap();
        assert!(root.exists());
        drop(scratch);
        assert!(!root.exists());
    }

    #[test]
    fn test_release_keeps_files() {
        let scratch = ScratchDir::new().unwrap();
        std::fs::write(scratch.path().join("member.txt"), b"data").unwrap();
        let root = scratch.release();
        assert!(root.join("member.txt").exists());
        std::fs::remove_dir_all(&root).unwrap();
    }
}
