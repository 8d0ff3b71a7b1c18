//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory to get metadata for all files
//! 4. For extraction, read each file's Local File Header and data
//!
//! Every declared offset and size is checked against the real file length
//! before it is used to allocate or read.

use crate::error::{ExtractionError, Result};
use crate::io::{ByteCursor, ReadAt};

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Low-level ZIP file parser.
///
/// Borrows the archive handle for the duration of one extraction run;
/// it never outlives the reader it parses.
///
/// ## Example
///
/// ```no_run
/// use std::path::Path;
/// use zipguard::io::LocalFileReader;
/// use zipguard::zip::ZipParser;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let reader = LocalFileReader::new(Path::new("archive.zip"))?;
/// let parser = ZipParser::new(&reader);
/// for entry in parser.list_files()? {
///     let offset = parser.get_data_offset(&entry)?;
///     println!("{} starts at {offset}", entry.file_name);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ZipParser<'a, R: ReadAt + ?Sized> {
    /// The underlying data source
    reader: &'a R,
    /// Total size of the archive in bytes
    size: u64,
}

impl<'a, R: ReadAt + ?Sized> ZipParser<'a, R> {
    /// Create a new parser for the given reader.
    pub fn new(reader: &'a R) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Read `len` bytes at `offset`, checking the range against the file size first.
    fn read_range(&self, offset: u64, len: u64, what: &str) -> Result<Vec<u8>> {
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= self.size)
            .ok_or_else(|| {
                ExtractionError::truncated(format!(
                    "{what} at offset {offset} ({len} bytes) runs past end of file ({} bytes)",
                    self.size
                ))
            })?;
        log::trace!("reading {what}: {offset}..{end}");

        let len = usize::try_from(len)
            .map_err(|_| ExtractionError::truncated(format!("{what} is too large")))?;
        let mut buf = vec![0u8; len];
        self.reader
            .read_exact_at(offset, &mut buf)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::UnexpectedEof => {
                    ExtractionError::truncated(format!("{what} is cut short"))
                }
                _ => ExtractionError::Io(e),
            })?;
        Ok(buf)
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// The EOCD is located at the end of the ZIP file. This method
    /// handles both the simple case (no comment) and archives with
    /// comments by searching backwards for the signature.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCD record, offset of EOCD in file).
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Format`] if no valid EOCD can be found,
    /// indicating the file is not a valid ZIP archive.
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let record = EndOfCentralDirectory::SIZE as u64;
        if self.size < record {
            return Err(ExtractionError::format(format!(
                "file is {} bytes, too small to be a ZIP archive",
                self.size
            )));
        }

        // Search window covers the largest possible comment behind the record.
        let search_size = (MAX_COMMENT_SIZE + record).min(self.size);
        let search_start = self.size - search_size;
        let buf = self.read_range(search_start, search_size, "archive tail")?;

        // Search backwards for EOCD signature (PK\x05\x06); the comment
        // length must account for exactly the bytes after the record.
        let last = buf.len() - EndOfCentralDirectory::SIZE;
        for i in (0..=last).rev() {
            if &buf[i..i + 4] != EndOfCentralDirectory::SIGNATURE {
                continue;
            }
            let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;
            if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                let eocd = EndOfCentralDirectory::from_bytes(&buf[i..])?;
                let offset = search_start + i as u64;
                log::trace!(
                    "end of central directory at {offset}, {} entries",
                    eocd.total_entries
                );
                return Ok((eocd, offset));
            }
        }

        Err(ExtractionError::format(
            "end of central directory signature not found",
        ))
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// Called when the regular EOCD indicates ZIP64 extensions are needed
    /// (fields set to 0xFFFF or 0xFFFFFFFF).
    pub fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD> {
        // The ZIP64 EOCD Locator is located immediately before the regular EOCD
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or_else(|| ExtractionError::format("missing ZIP64 locator"))?;
        let locator_buf = self.read_range(
            locator_offset,
            Zip64EOCDLocator::SIZE as u64,
            "ZIP64 locator",
        )?;
        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;
        if locator.total_disks > 1 || locator.disk_with_eocd64 != 0 {
            return Err(ExtractionError::format(
                "multi-volume archives are not supported",
            ));
        }

        // Read the actual ZIP64 EOCD from the offset specified in the locator
        let eocd64_buf = self.read_range(
            locator.eocd64_offset,
            Zip64EOCD::MIN_SIZE as u64,
            "ZIP64 end of central directory",
        )?;
        let eocd64 = Zip64EOCD::from_bytes(&eocd64_buf)?;
        if eocd64.disk_number != 0 || eocd64.disk_with_cd != 0 {
            return Err(ExtractionError::format(
                "multi-volume archives are not supported",
            ));
        }
        Ok(eocd64)
    }

    /// List all files in the ZIP archive.
    ///
    /// Reads the EOCD first, then fetches and parses the entire Central
    /// Directory. Entries are returned in central-directory order.
    ///
    /// # Errors
    ///
    /// - [`ExtractionError::Format`] if a record signature is wrong or an
    ///   entry name is not valid UTF-8
    /// - [`ExtractionError::TruncatedArchive`] if the central directory
    ///   lies outside the file or ends before the declared entry count
    pub fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        // Find and parse the EOCD to get Central Directory location
        let (eocd, eocd_offset) = self.find_eocd()?;
        if eocd.is_multi_disk() {
            return Err(ExtractionError::format(
                "multi-volume archives are not supported",
            ));
        }

        // Get Central Directory info, using ZIP64 if needed
        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset)?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        if total_entries == 0 {
            return Ok(Vec::new());
        }

        // Read the entire Central Directory in one request
        let cd_data = self.read_range(cd_offset, cd_size, "central directory")?;

        // Capacity is bounded by what the directory bytes can actually hold.
        let max_entries = cd_size / CDFH_MIN_SIZE as u64;
        let mut entries = Vec::with_capacity(total_entries.min(max_entries) as usize);
        let mut cursor = ByteCursor::new(&cd_data);

        for index in 0..total_entries {
            let entry = self.parse_cdfh(&mut cursor, index)?;
            log::trace!(
                "entry {index}: {} ({}, {} -> {} bytes)",
                entry.file_name,
                entry.compression_method,
                entry.compressed_size,
                entry.uncompressed_size
            );
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Parse a Central Directory File Header from a cursor.
    ///
    /// The CDFH contains metadata about a file in the archive, including
    /// its name, sizes, and location of the actual file data.
    fn parse_cdfh(&self, cursor: &mut ByteCursor<'_>, index: u64) -> Result<ZipFileEntry> {
        let cut_short = |_| {
            ExtractionError::truncated(format!(
                "central directory ends inside entry {index}"
            ))
        };

        // Read and verify the signature (PK\x01\x02)
        let sig = cursor.read_signature().map_err(cut_short)?;
        if sig != CDFH_SIGNATURE {
            return Err(ExtractionError::format(format!(
                "invalid central directory header for entry {index}"
            )));
        }

        let header = read_cdfh_fields(cursor).map_err(cut_short)?;

        // Read the variable-length file name
        let name_bytes = cursor
            .read_bytes(header.file_name_length as usize)
            .map_err(cut_short)?;
        let file_name = decode_entry_name(name_bytes, index)?;

        let extra = cursor
            .read_bytes(header.extra_field_length as usize)
            .map_err(cut_short)?;
        let (compressed_size, uncompressed_size, lfh_offset) = apply_zip64_extra(
            extra,
            header.compressed_size,
            header.uncompressed_size,
            header.lfh_offset,
        )
        .map_err(cut_short)?;

        // Skip over the file comment (we don't use it)
        cursor
            .skip(header.file_comment_length as u64)
            .map_err(cut_short)?;

        // Directory entries end with '/', or carry a directory attribute and no data
        let is_directory = file_name.ends_with('/')
            || (uncompressed_size == 0
                && attrs_mark_directory(header.version_made_by, header.external_attrs));

        Ok(ZipFileEntry {
            file_name,
            compression_method: CompressionMethod::from_u16(header.compression_method),
            flags: header.flags,
            compressed_size,
            uncompressed_size,
            crc32: header.crc32,
            version_made_by: header.version_made_by,
            external_attrs: header.external_attrs,
            lfh_offset,
            last_mod_time: header.last_mod_time,
            last_mod_date: header.last_mod_date,
            is_directory,
        })
    }

    /// Get the actual data offset for a file entry.
    ///
    /// The Local File Header (LFH) has variable-length fields (filename,
    /// extra field) that may differ from the Central Directory entry.
    /// This method reads the LFH to calculate where the actual file
    /// data begins.
    pub fn get_data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        self.locate_payload(entry.lfh_offset)
    }

    /// Compute where the payload behind the local header at `lfh_offset` begins.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Format`] if the signature at the offset
    /// is not a local file header.
    pub fn locate_payload(&self, lfh_offset: u64) -> Result<u64> {
        let lfh_buf = self.read_range(lfh_offset, LFH_SIZE as u64, "local file header")?;

        // Verify LFH signature (PK\x03\x04)
        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(ExtractionError::format(format!(
                "invalid local file header at offset {lfh_offset}"
            )));
        }

        // Read the variable field lengths from fixed positions in LFH
        let mut cursor = ByteCursor::new(&lfh_buf);
        let lengths = cursor.seek_to(26).and_then(|()| {
            let file_name_length = cursor.read_u16()? as u64;
            let extra_field_length = cursor.read_u16()? as u64;
            Ok(file_name_length + extra_field_length)
        });
        let variable = lengths
            .map_err(|_| ExtractionError::truncated("local file header is cut short"))?;

        // Data starts after: LFH (30 bytes) + filename + extra field
        Ok(lfh_offset + LFH_SIZE as u64 + variable)
    }

    /// Read the compressed payload of an entry.
    pub fn read_payload(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        let data_offset = self.get_data_offset(entry)?;
        self.read_range(
            data_offset,
            entry.compressed_size,
            &format!("data of {}", entry.file_name),
        )
    }
}

/// Fixed-size part of a central directory header, after the signature.
struct CdfhFields {
    version_made_by: u16,
    flags: u16,
    compression_method: u16,
    last_mod_time: u16,
    last_mod_date: u16,
    crc32: u32,
    compressed_size: u64,
    uncompressed_size: u64,
    file_name_length: u16,
    extra_field_length: u16,
    file_comment_length: u16,
    external_attrs: u32,
    lfh_offset: u64,
}

fn read_cdfh_fields(cursor: &mut ByteCursor<'_>) -> std::io::Result<CdfhFields> {
    let version_made_by = cursor.read_u16()?;
    let _version_needed = cursor.read_u16()?;
    let flags = cursor.read_u16()?;
    let compression_method = cursor.read_u16()?;
    let last_mod_time = cursor.read_u16()?;
    let last_mod_date = cursor.read_u16()?;
    let crc32 = cursor.read_u32()?;
    let compressed_size = cursor.read_u32()? as u64;
    let uncompressed_size = cursor.read_u32()? as u64;
    let file_name_length = cursor.read_u16()?;
    let extra_field_length = cursor.read_u16()?;
    let file_comment_length = cursor.read_u16()?;
    let _disk_number_start = cursor.read_u16()?;
    let _internal_attrs = cursor.read_u16()?;
    let external_attrs = cursor.read_u32()?;
    let lfh_offset = cursor.read_u32()? as u64;
    Ok(CdfhFields {
        version_made_by,
        flags,
        compression_method,
        last_mod_time,
        last_mod_date,
        crc32,
        compressed_size,
        uncompressed_size,
        file_name_length,
        extra_field_length,
        file_comment_length,
        external_attrs,
        lfh_offset,
    })
}

/// Entry names must be UTF-8 without NUL bytes; anything else is rejected.
fn decode_entry_name(bytes: &[u8], index: u64) -> Result<String> {
    let name = std::str::from_utf8(bytes).map_err(|_| {
        ExtractionError::format(format!("name of entry {index} is not valid UTF-8"))
    })?;
    if name.is_empty() || name.contains('\0') {
        return Err(ExtractionError::format(format!(
            "name of entry {index} is empty or contains NUL"
        )));
    }
    Ok(name.to_string())
}

/// Replace saturated 32-bit fields with values from the ZIP64 extra block.
///
/// Fields are present only if the corresponding header field is 0xFFFFFFFF,
/// in the order uncompressed size, compressed size, header offset.
fn apply_zip64_extra(
    extra: &[u8],
    mut compressed_size: u64,
    mut uncompressed_size: u64,
    mut lfh_offset: u64,
) -> std::io::Result<(u64, u64, u64)> {
    let mut cursor = ByteCursor::new(extra);
    while cursor.remaining() >= 4 {
        let header_id = cursor.read_u16()?;
        let field_size = cursor.read_u16()? as u64;
        let field_end = cursor.position() + field_size;

        if header_id == ZIP64_EXTRA_ID {
            if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                uncompressed_size = cursor.read_u64()?;
            }
            if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                compressed_size = cursor.read_u64()?;
            }
            if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                lfh_offset = cursor.read_u64()?;
            }
        }
        // Skip unknown extra fields and any unused ZIP64 tail
        cursor.seek_to(field_end)?;
    }
    Ok((compressed_size, uncompressed_size, lfh_offset))
}
