//! Extraction orchestration.
//!
//! [`Unzipper`] drives one archive from directory parsing to files on disk:
//!
//! 1. Parse the central directory (the archive handle is opened here and
//!    closed when the call returns, on every path).
//! 2. Filter entries: skip-listed top-level directories, then the
//!    extension allow-list.
//! 3. Check every retained name for traversal before anything is written.
//! 4. Per entry, create missing directories, resolve the confined output
//!    path, decode the payload, and write it.
//!
//! A zip-slip attempt aborts the whole run; files already written by the
//! same call are removed again.

mod diagnostics;
mod options;
mod path;

pub use diagnostics::Diagnostics;
pub use options::{DEFAULT_DIR_MODE, ExtractOptions, SKIP_DIRS, is_skipped_dir};
pub use path::{TargetRoot, entry_components, resolve};

use std::fs::{self, DirBuilder};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{ExtractionError, Result};
use crate::io::LocalFileReader;
use crate::zip::{ZipExtractor, ZipFileEntry};

/// Files written by a successful extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    /// Absolute paths of written files, in archive order.
    pub files: Vec<PathBuf>,
    /// Directories created, root to leaf.
    pub directories: Vec<PathBuf>,
    /// Entries left out by the skip-list or the extension filter.
    pub skipped: usize,
}

/// An entry that passed filtering, with its name already split.
struct Planned<'e> {
    entry: &'e ZipFileEntry,
    /// Components of the directory the entry needs (the entry itself for
    /// directory placeholders).
    dirs: Vec<&'e str>,
}

/// ZIP extraction engine.
///
/// Holds only configuration; every call to [`Unzipper::extract`] gets its
/// own archive handle and its own [`Diagnostics`].
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use zipguard::{Diagnostics, ExtractOptions, Unzipper};
///
/// let unzipper = Unzipper::new(ExtractOptions::default().with_target_dir("out"));
/// let mut diagnostics = Diagnostics::new();
/// match unzipper.extract(Path::new("bundle.zip"), &mut diagnostics) {
///     Ok(result) => println!("wrote {} files", result.files.len()),
///     Err(_) => eprint!("{}", diagnostics.error_string("error: ", "\n")),
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Unzipper {
    options: ExtractOptions,
}

impl Unzipper {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// List the entries of an archive without extracting anything.
    pub fn list(&self, archive_path: &Path) -> Result<Vec<ZipFileEntry>> {
        let reader = LocalFileReader::new(archive_path)?;
        ZipExtractor::new(&reader).list_files()
    }

    /// Extract `archive_path` according to the configured options.
    ///
    /// Progress is appended to `diagnostics`; on failure the error message
    /// is appended to its error log before the error is returned.
    ///
    /// # Errors
    ///
    /// - [`ExtractionError::EmptyArchive`] if the archive has no entries
    /// - [`ExtractionError::PathEscape`] if any retained entry would land
    ///   outside the target directory
    /// - [`ExtractionError::DestinationWrite`] if a directory or file cannot
    ///   be created
    /// - parse and decode errors from the archive itself
    pub fn extract(
        &self,
        archive_path: &Path,
        diagnostics: &mut Diagnostics,
    ) -> Result<ExtractionResult> {
        let mut result = ExtractionResult::default();
        let mut created = Vec::new();
        match self.run(archive_path, diagnostics, &mut result, &mut created) {
            Ok(()) => Ok(result),
            Err(e) => {
                if e.is_security_violation() {
                    rollback(&created, &result, diagnostics);
                }
                diagnostics.error(e.to_string());
                Err(e)
            }
        }
    }

    fn run(
        &self,
        archive_path: &Path,
        diagnostics: &mut Diagnostics,
        result: &mut ExtractionResult,
        created: &mut Vec<PathBuf>,
    ) -> Result<()> {
        // Scoped to this call: dropped, and the file closed, on every return path.
        let reader = LocalFileReader::new(archive_path)?;
        let extractor = ZipExtractor::new(&reader).with_crc_check(self.options.verify_crc);

        let entries = extractor.list_files()?;
        if entries.is_empty() {
            return Err(ExtractionError::EmptyArchive);
        }
        diagnostics.debug(format!(
            "Found {} entries in {}",
            entries.len(),
            archive_path.display()
        ));

        let plan = self.plan(&entries, diagnostics, result)?;

        let target = self.options.resolve_target_dir(archive_path);
        let root = self.prepare_root(&target, diagnostics, result)?;

        for planned in &plan {
            let entry = planned.entry;
            if self.options.preserve_filepath {
                self.ensure_dirs(&root, &planned.dirs, diagnostics, result)?;
            }

            if entry.is_directory {
                diagnostics.debug(format!("Skipping directory entry: {}", entry.file_name));
                continue;
            }

            let output = resolve(&root, &entry.file_name, self.options.preserve_filepath)?;
            let existed = fs::symlink_metadata(&output).is_ok();
            let written = extractor.extract_to_file(entry, &output)?;
            if !existed {
                created.push(output.clone());
            }
            diagnostics.debug(format!(
                "Extracted: {} -> {} ({written} bytes)",
                entry.file_name,
                output.display()
            ));
            result.files.push(output);
        }

        Ok(())
    }

    /// Filter entries and check every retained name for traversal.
    ///
    /// Filtering works on a plain split of the name and never fails, so an
    /// entry the filters drop is omitted whatever its name looks like.
    /// Retained names are then checked before any filesystem change: a
    /// hostile name anywhere in the archive stops the extraction before
    /// the first file is written.
    fn plan<'e>(
        &self,
        entries: &'e [ZipFileEntry],
        diagnostics: &mut Diagnostics,
        result: &mut ExtractionResult,
    ) -> Result<Vec<Planned<'e>>> {
        let mut plan = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(top) = top_level_dir(entry).filter(|top| is_skipped_dir(top)) {
                diagnostics.debug(format!(
                    "Skipping {} (inside skipped directory {top})",
                    entry.file_name
                ));
                result.skipped += 1;
                continue;
            }

            if !self.options.allows_extension(entry.extension()) {
                diagnostics.debug(format!(
                    "Skipping {} (extension not allowed)",
                    entry.file_name
                ));
                result.skipped += 1;
                continue;
            }

            let components = entry_components(&entry.file_name)?;
            let dir_count = if entry.is_directory {
                components.len()
            } else {
                components.len().saturating_sub(1)
            };
            let dirs = components[..dir_count].to_vec();

            plan.push(Planned { entry, dirs });
        }
        Ok(plan)
    }

    /// Canonicalize the target directory, creating it if it does not exist.
    fn prepare_root(
        &self,
        target: &Path,
        diagnostics: &mut Diagnostics,
        result: &mut ExtractionResult,
    ) -> Result<TargetRoot> {
        if !target.exists() {
            diagnostics.debug(format!("Creating folder: {}", target.display()));
            self.dir_builder()
                .recursive(true)
                .create(target)
                .map_err(|e| ExtractionError::write(target, e))?;
            result.directories.push(target.to_path_buf());
        }
        TargetRoot::new(target)
    }

    /// Create each missing directory under the root, root to leaf.
    ///
    /// Existing components are canonicalized before descending into them,
    /// so a symlinked directory pointing outside the root is caught before
    /// anything is created through it.
    fn ensure_dirs(
        &self,
        root: &TargetRoot,
        dirs: &[&str],
        diagnostics: &mut Diagnostics,
        result: &mut ExtractionResult,
    ) -> Result<()> {
        let mut current = root.as_path().to_path_buf();
        for dir in dirs {
            current.push(dir);
            match fs::symlink_metadata(&current) {
                Ok(_) => {
                    let canonical = root.confine(&current)?;
                    if !canonical.is_dir() {
                        return Err(ExtractionError::write(
                            &current,
                            io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
                        ));
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    diagnostics.debug(format!("Creating folder: {}", current.display()));
                    self.dir_builder()
                        .create(&current)
                        .map_err(|e| ExtractionError::write(&current, e))?;
                    result.directories.push(current.clone());
                }
                Err(e) => return Err(ExtractionError::write(&current, e)),
            }
        }
        Ok(())
    }

    /// Directory builder carrying the configured creation mode.
    fn dir_builder(&self) -> DirBuilder {
        #[allow(unused_mut)]
        let mut builder = DirBuilder::new();
        #[cfg(unix)]
        if let Some(mode) = self.options.directory_creation_mode {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        builder
    }
}

/// First component of the entry's directory portion, if it has one.
fn top_level_dir(entry: &ZipFileEntry) -> Option<&str> {
    let mut parts = entry
        .file_name
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".");
    let first = parts.next()?;
    if entry.is_directory || parts.next().is_some() {
        Some(first)
    } else {
        None
    }
}

/// Remove files and directories created by an aborted extraction.
///
/// `created` lists only files that did not exist before the call; files
/// that were overwritten stay in place.
fn rollback(created: &[PathBuf], result: &ExtractionResult, diagnostics: &mut Diagnostics) {
    for file in created.iter().rev() {
        if fs::remove_file(file).is_ok() {
            diagnostics.debug(format!("Removed {}", file.display()));
        }
    }
    // Only empty directories go; anything that was already there stays.
    for dir in result.directories.iter().rev() {
        if fs::remove_dir(dir).is_ok() {
            diagnostics.debug(format!("Removed folder {}", dir.display()));
        }
    }
}
