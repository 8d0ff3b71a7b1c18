//! # zipguard
//!
//! A ZIP extraction engine that refuses to write outside its target directory.
//!
//! The library parses the ZIP container itself (end of central directory,
//! central directory, local file headers), decodes stored and DEFLATE
//! payloads, and writes the selected entries under a target directory.
//! Every output path is canonicalized and checked against the target root,
//! so archives carrying `../` names, absolute paths, or names that lead
//! through symlinked directories are rejected before they can write
//! anywhere else ("zip-slip").
//!
//! ## Features
//!
//! - STORED and DEFLATE entries, with CRC-32 verification
//! - ZIP64 archives (large entry counts and offsets)
//! - Preserve or flatten the archive's directory structure
//! - Extension allow-list and a built-in skip-list for metadata folders
//! - Per-call debug and error diagnostics for the caller to display
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use zipguard::{Diagnostics, ExtractOptions, Unzipper};
//!
//! fn main() -> zipguard::Result<()> {
//!     let options = ExtractOptions::default()
//!         .with_target_dir("assets")
//!         .with_allowed_extensions(["png", "json"]);
//!     let unzipper = Unzipper::new(options);
//!
//!     let mut diagnostics = Diagnostics::new();
//!     let result = unzipper.extract(Path::new("bundle.zip"), &mut diagnostics)?;
//!     for file in &result.files {
//!         println!("{}", file.display());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod extract;
pub mod io;
#[doc(hidden)]
pub mod test_utils;
pub mod zip;

pub use cli::Cli;
pub use error::{ErrorKind, ExtractionError, Result};
pub use extract::{Diagnostics, ExtractOptions, ExtractionResult, Unzipper};
pub use io::{LocalFileReader, ReadAt};
pub use zip::{CompressionMethod, ZipExtractor, ZipFileEntry};
