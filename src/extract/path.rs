//! Zip-slip protection: mapping entry names to paths under the target root.
//!
//! Entry names are first checked lexically, then every output location is
//! canonicalized and compared against the canonical target root. A name
//! that cannot be proven to stay inside the root is treated as an escape.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{ExtractionError, Result};

/// Canonicalized extraction root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRoot {
    path: PathBuf,
}

impl TargetRoot {
    /// Canonicalize an existing directory as the extraction root.
    pub fn new(path: &Path) -> Result<Self> {
        let path = fs::canonicalize(path).map_err(|e| ExtractionError::write(path, e))?;
        if !path.is_dir() {
            return Err(ExtractionError::write(
                &path,
                io::Error::new(io::ErrorKind::NotADirectory, "target is not a directory"),
            ));
        }
        Ok(Self { path })
    }

    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// Whether a canonical path is the root or lies beneath it.
    pub fn contains(&self, canonical: &Path) -> bool {
        canonical.starts_with(&self.path)
    }

    /// Canonicalize `path` and require it to stay inside the root.
    pub(crate) fn confine(&self, path: &Path) -> Result<PathBuf> {
        let canonical = fs::canonicalize(path).map_err(|_| ExtractionError::escape(path))?;
        if !self.contains(&canonical) {
            return Err(ExtractionError::escape(canonical));
        }
        Ok(canonical)
    }
}

/// Split an entry name into the relative components it may write to.
///
/// Only plain names survive; `.` is dropped. Absolute paths, drive
/// prefixes, and `..` anywhere in the name mark the entry as an escape
/// attempt, even when the rest of the path would lead back inside.
pub fn entry_components(entry_name: &str) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    for component in Path::new(entry_name).components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| ExtractionError::escape(entry_name))?;
                parts.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractionError::escape(entry_name));
            }
        }
    }
    Ok(parts)
}

/// Resolve where an entry's file is written.
///
/// With `preserve_path` the full relative path is joined to the root;
/// otherwise only the final component is used. The parent directory of the
/// result must already exist: it is canonicalized (following symlinks) and
/// must lie inside `root`. If the output file itself already exists it is
/// canonicalized too, so a planted symlink cannot redirect the write.
///
/// # Errors
///
/// Returns [`ExtractionError::PathEscape`] for any name or location that
/// cannot be confirmed to stay inside the root, including a parent that
/// does not exist.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use zipguard::extract::{TargetRoot, resolve};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let root = TargetRoot::new(Path::new("/tmp/out"))?;
/// let flat = resolve(&root, "docs/readme.txt", false)?;
/// assert_eq!(flat, root.as_path().join("readme.txt"));
/// assert!(resolve(&root, "../../etc/passwd", true).is_err());
/// # Ok(())
/// # }
/// ```
pub fn resolve(root: &TargetRoot, entry_name: &str, preserve_path: bool) -> Result<PathBuf> {
    let components = entry_components(entry_name)?;
    let relative: PathBuf = if preserve_path {
        components.iter().collect()
    } else {
        components
            .last()
            .map(PathBuf::from)
            .ok_or_else(|| ExtractionError::escape(entry_name))?
    };
    let file_name = relative
        .file_name()
        .ok_or_else(|| ExtractionError::escape(entry_name))?
        .to_os_string();

    let candidate = root.as_path().join(&relative);
    let parent = candidate
        .parent()
        .ok_or_else(|| ExtractionError::escape(entry_name))?;
    let resolved = root.confine(parent)?.join(file_name);

    match fs::symlink_metadata(&resolved) {
        Ok(_) => root.confine(&resolved),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(resolved),
        Err(_) => Err(ExtractionError::escape(resolved)),
    }
}
