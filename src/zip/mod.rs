//! ZIP archive parsing and payload decoding.
//!
//! This module provides functionality for reading ZIP archives,
//! supporting both standard ZIP format and ZIP64 extensions for large archives.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Low-level parsing of ZIP structures from raw bytes
//! - [`decompress`]: Stored and raw-DEFLATE payload decoding with CRC-32 checks
//! - [`extractor`]: Per-archive payload extraction on top of the parser
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! This implementation reads the EOCD first (from the end of the file),
//! then the Central Directory, and only touches local headers when an
//! entry is actually extracted.
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

pub mod decompress;
pub mod extractor;
pub mod parser;
pub mod structures;

pub use decompress::{decompress, verify_crc};
pub use extractor::ZipExtractor;
pub use parser::ZipParser;
pub use structures::*;
