use std::fmt;
use std::path::Path;

use crate::error::{ExtractionError, Result};
use crate::io::ByteCursor;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionMethod::Stored => f.write_str("stored"),
            CompressionMethod::Deflate => f.write_str("deflate"),
            CompressionMethod::Unknown(v) => write!(f, "method {v}"),
        }
    }
}

/// Marks an open read of a fixed-size record as truncated.
fn short(record: &str) -> impl FnOnce(std::io::Error) -> ExtractionError + '_ {
    move |_| ExtractionError::truncated(format!("{record} is cut short"))
}

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug, Clone)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment: Vec<u8>,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    /// Parse the record; `data` must hold the fixed part and its comment.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let sig = cursor
            .read_signature()
            .map_err(short("end of central directory"))?;
        if sig != Self::SIGNATURE {
            return Err(ExtractionError::format(
                "invalid end of central directory signature",
            ));
        }

        let read = |cursor: &mut ByteCursor<'_>| -> std::io::Result<Self> {
            let disk_number = cursor.read_u16()?;
            let disk_with_cd = cursor.read_u16()?;
            let disk_entries = cursor.read_u16()?;
            let total_entries = cursor.read_u16()?;
            let cd_size = cursor.read_u32()?;
            let cd_offset = cursor.read_u32()?;
            let comment_len = cursor.read_u16()?;
            let comment = cursor.read_bytes(comment_len as usize)?.to_vec();
            Ok(Self {
                disk_number,
                disk_with_cd,
                disk_entries,
                total_entries,
                cd_size,
                cd_offset,
                comment,
            })
        };
        read(&mut cursor).map_err(short("end of central directory"))
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }

    pub fn is_multi_disk(&self) -> bool {
        self.disk_number != 0 || self.disk_with_cd != 0
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
#[derive(Debug, Clone)]
pub struct Zip64EOCDLocator {
    pub disk_with_eocd64: u32,
    pub eocd64_offset: u64,
    pub total_disks: u32,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let sig = cursor.read_signature().map_err(short("ZIP64 locator"))?;
        if sig != Self::SIGNATURE {
            return Err(ExtractionError::format("invalid ZIP64 locator signature"));
        }

        let read = |cursor: &mut ByteCursor<'_>| -> std::io::Result<Self> {
            Ok(Self {
                disk_with_eocd64: cursor.read_u32()?,
                eocd64_offset: cursor.read_u64()?,
                total_disks: cursor.read_u32()?,
            })
        };
        read(&mut cursor).map_err(short("ZIP64 locator"))
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
#[derive(Debug, Clone)]
pub struct Zip64EOCD {
    pub eocd64_size: u64,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let sig = cursor
            .read_signature()
            .map_err(short("ZIP64 end of central directory"))?;
        if sig != Self::SIGNATURE {
            return Err(ExtractionError::format(
                "invalid ZIP64 end of central directory signature",
            ));
        }

        let read = |cursor: &mut ByteCursor<'_>| -> std::io::Result<Self> {
            Ok(Self {
                eocd64_size: cursor.read_u64()?,
                version_made_by: cursor.read_u16()?,
                version_needed: cursor.read_u16()?,
                disk_number: cursor.read_u32()?,
                disk_with_cd: cursor.read_u32()?,
                disk_entries: cursor.read_u64()?,
                total_entries: cursor.read_u64()?,
                cd_size: cursor.read_u64()?,
                cd_offset: cursor.read_u64()?,
            })
        };
        read(&mut cursor).map_err(short("ZIP64 end of central directory"))
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Extra field id of the ZIP64 extended information block.
pub const ZIP64_EXTRA_ID: u16 = 0x0001;

/// General purpose flag: entry is encrypted.
pub const FLAG_ENCRYPTED: u16 = 0x0001;

/// MS-DOS directory attribute in the low byte of the external attributes.
const DOS_DIRECTORY_ATTR: u32 = 0x10;
/// `version made by` host id for Unix.
const HOST_UNIX: u8 = 3;
const UNIX_FILE_TYPE_MASK: u32 = 0o170000;
const UNIX_DIRECTORY: u32 = 0o040000;

/// Parsed ZIP file entry information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub flags: u16,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub version_made_by: u16,
    pub external_attrs: u32,
    pub lfh_offset: u64,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub is_directory: bool,
}

impl ZipFileEntry {
    /// Stored entry name.
    pub fn name(&self) -> &str {
        &self.file_name
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Extension of the entry's final component, if it has one.
    ///
    /// Directory entries never have an extension.
    pub fn extension(&self) -> Option<&str> {
        if self.is_directory {
            return None;
        }
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}

/// Whether the external attributes describe a directory.
///
/// The DOS attribute bit is honored for every host; the Unix file type in
/// the high 16 bits only when the archive was made on Unix.
pub fn attrs_mark_directory(version_made_by: u16, external_attrs: u32) -> bool {
    if external_attrs & DOS_DIRECTORY_ATTR != 0 {
        return true;
    }
    let host = (version_made_by >> 8) as u8;
    host == HOST_UNIX && (external_attrs >> 16) & UNIX_FILE_TYPE_MASK == UNIX_DIRECTORY
}
