//! Error types for archive parsing and extraction.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `ExtractionError`.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Errors that can occur while reading or extracting an archive.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Reading the archive file failed.
    #[error("I/O error reading archive: {0}")]
    Io(#[from] std::io::Error),

    /// Archive structure is malformed or unrecognized.
    #[error("invalid archive: {0}")]
    Format(String),

    /// Declared sizes or offsets point past the end of the file.
    #[error("truncated archive: {0}")]
    TruncatedArchive(String),

    /// The central directory lists no entries.
    #[error("ZIP archive is empty")]
    EmptyArchive,

    /// Entry uses a compression method or feature that is not implemented.
    #[error("unsupported entry: {0}")]
    UnsupportedMethod(String),

    /// Decompressed payload does not match what the directory declares.
    #[error("corrupt entry data: {reason}")]
    CorruptData {
        /// What did not match.
        reason: String,
        /// Decoder error, when the stream itself was malformed.
        #[source]
        source: Option<std::io::Error>,
    },

    /// Entry would be written outside the target directory.
    #[error("ZIP file attempted to use the zip-slip vulnerability ({path}), extraction aborted")]
    PathEscape {
        /// The offending entry name or resolved path.
        path: PathBuf,
    },

    /// Creating a directory or writing a file under the target failed.
    #[error("destination path is not writable: {path}")]
    DestinationWrite {
        /// Path that could not be created or written.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
}

/// Discriminant of [`ExtractionError`], for callers that only match on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Io,
    Format,
    TruncatedArchive,
    EmptyArchive,
    UnsupportedMethod,
    CorruptData,
    PathEscape,
    DestinationWrite,
}

impl ExtractionError {
    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Format(_) => ErrorKind::Format,
            Self::TruncatedArchive(_) => ErrorKind::TruncatedArchive,
            Self::EmptyArchive => ErrorKind::EmptyArchive,
            Self::UnsupportedMethod(_) => ErrorKind::UnsupportedMethod,
            Self::CorruptData { .. } => ErrorKind::CorruptData,
            Self::PathEscape { .. } => ErrorKind::PathEscape,
            Self::DestinationWrite { .. } => ErrorKind::DestinationWrite,
        }
    }

    /// Returns `true` if this error means the archive is adversarial.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::PathBuf;
    /// use zipguard::ExtractionError;
    ///
    /// let err = ExtractionError::PathEscape {
    ///     path: PathBuf::from("../etc/passwd"),
    /// };
    /// assert!(err.is_security_violation());
    /// assert!(!ExtractionError::EmptyArchive.is_security_violation());
    /// ```
    #[must_use]
    pub const fn is_security_violation(&self) -> bool {
        matches!(self, Self::PathEscape { .. })
    }

    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub(crate) fn truncated(msg: impl Into<String>) -> Self {
        Self::TruncatedArchive(msg.into())
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptData {
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn escape(path: impl Into<PathBuf>) -> Self {
        Self::PathEscape { path: path.into() }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DestinationWrite {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(ExtractionError::EmptyArchive.kind(), ErrorKind::EmptyArchive);
        assert_eq!(
            ExtractionError::format("bad").kind(),
            ErrorKind::Format
        );
        assert_eq!(
            ExtractionError::escape("../x").kind(),
            ErrorKind::PathEscape
        );
    }

    #[test]
    fn test_destination_write_keeps_source() {
        let err = ExtractionError::write(
            "/nope",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), ErrorKind::DestinationWrite);
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "destination path is not writable: /nope");
    }

    #[test]
    fn test_corrupt_without_source() {
        let err = ExtractionError::corrupt("size mismatch");
        assert!(err.source().is_none());
        assert_eq!(err.to_string(), "corrupt entry data: size mismatch");
    }
}
