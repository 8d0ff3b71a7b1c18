//! Extraction configuration.

use std::path::{Path, PathBuf};

/// Top-level directory names that are never extracted.
///
/// These hold platform metadata (resource forks and the like) that is
/// useless outside the machine that produced the archive.
pub const SKIP_DIRS: &[&str] = &["__MACOSX"];

/// Mode requested for directories created during extraction, before umask.
pub const DEFAULT_DIR_MODE: u32 = 0o777;

/// Options controlling where and what an extraction writes.
///
/// # Examples
///
/// ```
/// use zipguard::ExtractOptions;
///
/// let options = ExtractOptions::default()
///     .with_target_dir("/tmp/out")
///     .with_allowed_extensions(["txt", "md"])
///     .with_preserve_filepath(false);
/// assert!(options.allows_extension(Some("md")));
/// assert!(!options.allows_extension(Some("png")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Directory to extract into; `None` means the archive's own directory.
    pub target_dir: Option<PathBuf>,

    /// Recreate the archive's directory structure. When `false`, every
    /// file lands directly in the target directory under its basename.
    pub preserve_filepath: bool,

    /// Extensions to extract (case-sensitive, without the dot); `None`
    /// allows everything. Entries without an extension are always allowed.
    pub allowed_extensions: Option<Vec<String>>,

    /// Mode applied to each directory the extraction creates; `None`
    /// leaves the platform default.
    pub directory_creation_mode: Option<u32>,

    /// Check the CRC-32 of every decoded payload.
    pub verify_crc: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            target_dir: None,
            preserve_filepath: true,
            allowed_extensions: None,
            directory_creation_mode: Some(DEFAULT_DIR_MODE),
            verify_crc: true,
        }
    }
}

impl ExtractOptions {
    pub fn with_target_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.target_dir = Some(dir.into());
        self
    }

    pub fn with_preserve_filepath(mut self, preserve: bool) -> Self {
        self.preserve_filepath = preserve;
        self
    }

    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    /// Allow every extension again.
    pub fn allow_all_extensions(mut self) -> Self {
        self.allowed_extensions = None;
        self
    }

    pub fn with_directory_creation_mode(mut self, mode: Option<u32>) -> Self {
        self.directory_creation_mode = mode;
        self
    }

    pub fn with_crc_check(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }

    /// Whether an entry with this extension passes the allow-list.
    pub fn allows_extension(&self, extension: Option<&str>) -> bool {
        match (&self.allowed_extensions, extension) {
            (None, _) | (Some(_), None) => true,
            (Some(allowed), Some(ext)) => allowed.iter().any(|a| a == ext),
        }
    }

    /// Target directory for an archive at `archive_path`.
    pub fn resolve_target_dir(&self, archive_path: &Path) -> PathBuf {
        match &self.target_dir {
            Some(dir) => dir.clone(),
            None => match archive_path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        }
    }
}

/// Whether `top_level` is a skip-listed directory name.
pub fn is_skipped_dir(top_level: &str) -> bool {
    SKIP_DIRS.contains(&top_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ExtractOptions::default();
        assert!(options.preserve_filepath);
        assert!(options.verify_crc);
        assert_eq!(options.directory_creation_mode, Some(0o777));
        assert!(options.allows_extension(Some("exe")));
        assert!(options.allows_extension(None));
    }

    #[test]
    fn test_allow_list_is_case_sensitive() {
        let options = ExtractOptions::default().with_allowed_extensions(["txt"]);
        assert!(options.allows_extension(Some("txt")));
        assert!(!options.allows_extension(Some("TXT")));
        assert!(!options.allows_extension(Some("png")));
        // No extension: the allow-list does not apply
        assert!(options.allows_extension(None));

        let options = options.allow_all_extensions();
        assert!(options.allows_extension(Some("png")));
    }

    #[test]
    fn test_target_dir_defaults_to_archive_dir() {
        let options = ExtractOptions::default();
        assert_eq!(
            options.resolve_target_dir(Path::new("/data/in/archive.zip")),
            PathBuf::from("/data/in")
        );
        assert_eq!(
            options.resolve_target_dir(Path::new("archive.zip")),
            PathBuf::from(".")
        );

        let options = options.with_target_dir("/elsewhere");
        assert_eq!(
            options.resolve_target_dir(Path::new("/data/in/archive.zip")),
            PathBuf::from("/elsewhere")
        );
    }

    #[test]
    fn test_skip_list() {
        assert!(is_skipped_dir("__MACOSX"));
        assert!(!is_skipped_dir("__macosx"));
        assert!(!is_skipped_dir("docs"));
    }
}
