use std::fs;
use std::path::Path;

use crate::error::{ExtractionError, Result};
use crate::io::ReadAt;

use super::decompress::{decompress, verify_crc};
use super::parser::ZipParser;
use super::structures::ZipFileEntry;

/// ZIP file extractor
///
/// Pairs a [`ZipParser`] with payload decoding. Path safety is not its
/// concern: callers hand it an already-resolved output path.
pub struct ZipExtractor<'a, R: ReadAt + ?Sized> {
    parser: ZipParser<'a, R>,
    verify_crc: bool,
}

impl<'a, R: ReadAt + ?Sized> ZipExtractor<'a, R> {
    pub fn new(reader: &'a R) -> Self {
        Self {
            parser: ZipParser::new(reader),
            verify_crc: true,
        }
    }

    /// Enable or disable CRC-32 checking of decoded payloads.
    pub fn with_crc_check(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }

    /// List all files in the archive
    pub fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files()
    }

    /// Extract file data to memory
    pub fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        if entry.is_encrypted() {
            return Err(ExtractionError::UnsupportedMethod(format!(
                "{} is encrypted",
                entry.file_name
            )));
        }

        let compressed = self.parser.read_payload(entry)?;
        let data = decompress(
            entry.compression_method,
            &compressed,
            entry.uncompressed_size,
        )?;
        if self.verify_crc {
            verify_crc(&data, entry.crc32)?;
        }
        Ok(data)
    }

    /// Extract file to disk
    ///
    /// The parent of `output_path` must already exist.
    pub fn extract_to_file(&self, entry: &ZipFileEntry, output_path: &Path) -> Result<u64> {
        let data = self.extract_to_memory(entry)?;
        fs::write(output_path, &data).map_err(|e| ExtractionError::write(output_path, e))?;
        Ok(data.len() as u64)
    }
}
