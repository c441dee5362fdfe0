//! Working-boundary confinement for file-touching tools.
//!
//! A single directory is established at startup and canonicalized once;
//! every tool-supplied filename must resolve to a descendant of it before
//! any filesystem operation runs.

use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("path escapes the sandbox directory")]
    Escape,
    #[error("file not found")]
    NotFound,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The boundary directory. Created once, lives for the process lifetime,
/// never relocated.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Create the boundary directory if absent and pin its canonical form.
    pub fn create(root: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a filename that must already exist inside the boundary.
    /// Symlinks are followed before the containment check, so a link
    /// pointing outside is an escape, not a hit.
    pub fn resolve_existing(&self, name: &str) -> Result<PathBuf, SandboxError> {
        let candidate = self.candidate(name)?;
        let canonical = candidate.canonicalize().map_err(not_found_or_io)?;
        if !canonical.starts_with(&self.root) {
            return Err(SandboxError::Escape);
        }
        Ok(canonical)
    }

    /// Resolve a filename for writing. The file itself may not exist yet;
    /// its parent directory must, and must sit inside the boundary.
    pub fn resolve_writable(&self, name: &str) -> Result<PathBuf, SandboxError> {
        let candidate = self.candidate(name)?;

        // An existing target (possibly a symlink) is checked in full.
        match candidate.canonicalize() {
            Ok(canonical) => {
                if !canonical.starts_with(&self.root) {
                    return Err(SandboxError::Escape);
                }
                return Ok(canonical);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(SandboxError::Io(e)),
        }

        let file_name = candidate
            .file_name()
            .ok_or(SandboxError::Escape)?
            .to_os_string();
        let parent = candidate.parent().ok_or(SandboxError::Escape)?;
        let parent = parent.canonicalize().map_err(not_found_or_io)?;
        if !parent.starts_with(&self.root) {
            return Err(SandboxError::Escape);
        }
        Ok(parent.join(file_name))
    }

    /// Reject traversal attempts before touching the filesystem, then join
    /// the relative name onto the boundary root.
    fn candidate(&self, name: &str) -> Result<PathBuf, SandboxError> {
        let rel = Path::new(name);
        if rel.is_absolute() || name.starts_with('\\') {
            return Err(SandboxError::Escape);
        }
        if rel.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(SandboxError::Escape);
        }
        Ok(self.root.join(rel))
    }
}

fn not_found_or_io(e: io::Error) -> SandboxError {
    if e.kind() == io::ErrorKind::NotFound {
        SandboxError::NotFound
    } else {
        SandboxError::Io(e)
    }
}
