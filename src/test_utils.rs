//! Test utilities for building ZIP archives byte by byte.
//!
//! The builder writes local headers, the central directory, and the end
//! record directly, so tests can produce archives that a regular ZIP writer
//! would refuse to emit: traversal names, wrong CRCs, odd attributes.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::Crc;
use flate2::write::DeflateEncoder;
use std::io::Write;
use std::path::{Path, PathBuf};

/// 1980-01-01, the DOS epoch.
const DOS_DATE: u16 = (1 << 5) | 1;

/// One member of a test archive.
#[derive(Debug, Clone)]
pub struct TestEntry {
    name: Vec<u8>,
    data: Vec<u8>,
    method: u16,
    flags: u16,
    version_made_by: u16,
    external_attrs: u32,
    crc: Option<u32>,
    local_extra: Vec<u8>,
}

impl TestEntry {
    fn new(name: &str, data: &[u8], method: u16) -> Self {
        Self {
            name: name.as_bytes().to_vec(),
            data: data.to_vec(),
            method,
            flags: 0,
            version_made_by: 20,
            external_attrs: 0,
            crc: None,
            local_extra: Vec::new(),
        }
    }

    /// Entry stored without compression.
    pub fn stored(name: &str, data: &[u8]) -> Self {
        Self::new(name, data, 0)
    }

    /// Entry compressed with raw DEFLATE.
    pub fn deflated(name: &str, data: &[u8]) -> Self {
        Self::new(name, data, 8)
    }

    /// Directory placeholder; `name` should end with `/`.
    pub fn directory(name: &str) -> Self {
        Self::new(name, b"", 0).with_external_attrs(0x10)
    }

    /// Record an arbitrary method code; the data is written as-is.
    pub fn with_method(mut self, method: u16) -> Self {
        self.method = method;
        self
    }

    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_crc(mut self, crc: u32) -> Self {
        self.crc = Some(crc);
        self
    }

    pub fn with_external_attrs(mut self, attrs: u32) -> Self {
        self.external_attrs = attrs;
        self
    }

    pub fn with_version_made_by(mut self, version: u16) -> Self {
        self.version_made_by = version;
        self
    }

    pub fn with_local_extra(mut self, extra: Vec<u8>) -> Self {
        self.local_extra = extra;
        self
    }

    pub fn with_raw_name(mut self, name: Vec<u8>) -> Self {
        self.name = name;
        self
    }

    fn payload(&self) -> Vec<u8> {
        if self.method == 8 {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&self.data).unwrap();
            encoder.finish().unwrap()
        } else {
            self.data.clone()
        }
    }

    fn crc(&self) -> u32 {
        self.crc.unwrap_or_else(|| {
            let mut crc = Crc::new();
            crc.update(&self.data);
            crc.sum()
        })
    }
}

/// Builder for in-memory ZIP archives.
///
/// # Examples
///
/// ```
/// use zipguard::test_utils::ZipBuilder;
///
/// let zip = ZipBuilder::new()
///     .stored("a.txt", b"hello")
///     .deflated("dir/b.txt", b"world")
///     .directory("dir/")
///     .build();
/// assert_eq!(&zip[..4], b"PK\x03\x04");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ZipBuilder {
    entries: Vec<TestEntry>,
    comment: Vec<u8>,
    zip64: bool,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, entry: TestEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.entry(TestEntry::stored(name, data))
    }

    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        self.entry(TestEntry::deflated(name, data))
    }

    pub fn directory(self, name: &str) -> Self {
        self.entry(TestEntry::directory(name))
    }

    /// Archive comment written after the end record.
    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    /// Emit ZIP64 records with saturated 32-bit fields.
    pub fn zip64(mut self) -> Self {
        self.zip64 = true;
        self
    }

    /// Serialize the archive.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut central = Vec::new();

        for entry in &self.entries {
            let offset = out.len() as u64;
            let payload = entry.payload();
            let crc = entry.crc();

            out.write_all(b"PK\x03\x04").unwrap();
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(entry.flags).unwrap();
            out.write_u16::<LittleEndian>(entry.method).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(DOS_DATE).unwrap();
            out.write_u32::<LittleEndian>(crc).unwrap();
            out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(entry.data.len() as u32).unwrap();
            out.write_u16::<LittleEndian>(entry.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(entry.local_extra.len() as u16)
                .unwrap();
            out.write_all(&entry.name).unwrap();
            out.write_all(&entry.local_extra).unwrap();
            out.write_all(&payload).unwrap();

            let mut extra = Vec::new();
            let (csize, usize_, offset32) = if self.zip64 {
                extra.write_u16::<LittleEndian>(0x0001).unwrap();
                extra.write_u16::<LittleEndian>(24).unwrap();
                extra.write_u64::<LittleEndian>(entry.data.len() as u64).unwrap();
                extra.write_u64::<LittleEndian>(payload.len() as u64).unwrap();
                extra.write_u64::<LittleEndian>(offset).unwrap();
                (u32::MAX, u32::MAX, u32::MAX)
            } else {
                (
                    payload.len() as u32,
                    entry.data.len() as u32,
                    offset as u32,
                )
            };

            central.write_all(b"PK\x01\x02").unwrap();
            central
                .write_u16::<LittleEndian>(entry.version_made_by)
                .unwrap();
            central.write_u16::<LittleEndian>(20).unwrap();
            central.write_u16::<LittleEndian>(entry.flags).unwrap();
            central.write_u16::<LittleEndian>(entry.method).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(DOS_DATE).unwrap();
            central.write_u32::<LittleEndian>(crc).unwrap();
            central.write_u32::<LittleEndian>(csize).unwrap();
            central.write_u32::<LittleEndian>(usize_).unwrap();
            central.write_u16::<LittleEndian>(entry.name.len() as u16).unwrap();
            central.write_u16::<LittleEndian>(extra.len() as u16).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central
                .write_u32::<LittleEndian>(entry.external_attrs)
                .unwrap();
            central.write_u32::<LittleEndian>(offset32).unwrap();
            central.write_all(&entry.name).unwrap();
            central.write_all(&extra).unwrap();
        }

        let cd_offset = out.len() as u64;
        let cd_size = central.len() as u64;
        let count = self.entries.len() as u64;
        out.write_all(&central).unwrap();

        if self.zip64 {
            let eocd64_offset = out.len() as u64;
            out.write_all(b"PK\x06\x06").unwrap();
            out.write_u64::<LittleEndian>(44).unwrap();
            out.write_u16::<LittleEndian>(45).unwrap();
            out.write_u16::<LittleEndian>(45).unwrap();
            out.write_u32::<LittleEndian>(0).unwrap();
            out.write_u32::<LittleEndian>(0).unwrap();
            out.write_u64::<LittleEndian>(count).unwrap();
            out.write_u64::<LittleEndian>(count).unwrap();
            out.write_u64::<LittleEndian>(cd_size).unwrap();
            out.write_u64::<LittleEndian>(cd_offset).unwrap();

            out.write_all(b"PK\x06\x07").unwrap();
            out.write_u32::<LittleEndian>(0).unwrap();
            out.write_u64::<LittleEndian>(eocd64_offset).unwrap();
            out.write_u32::<LittleEndian>(1).unwrap();
        }

        let (count16, size32, offset32) = if self.zip64 {
            (u16::MAX, u32::MAX, u32::MAX)
        } else {
            (count as u16, cd_size as u32, cd_offset as u32)
        };
        out.write_all(b"PK\x05\x06").unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(count16).unwrap();
        out.write_u16::<LittleEndian>(count16).unwrap();
        out.write_u32::<LittleEndian>(size32).unwrap();
        out.write_u32::<LittleEndian>(offset32).unwrap();
        out.write_u16::<LittleEndian>(self.comment.len() as u16)
            .unwrap();
        out.write_all(&self.comment).unwrap();
        out
    }

    /// Serialize the archive to `dir/name` and return the file path.
    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}
