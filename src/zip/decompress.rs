//! Payload decoding for the supported compression methods.

use std::io::Read;

use flate2::Crc;
use flate2::read::DeflateDecoder;

use crate::error::{ExtractionError, Result};

use super::structures::CompressionMethod;

/// Upper bound on up-front allocation; larger payloads grow as they inflate.
const MAX_PREALLOC: usize = 64 * 1024 * 1024;

/// Decode `data` stored with `method` into exactly `expected_size` bytes.
///
/// Stored payloads are copied; deflate payloads are raw DEFLATE streams
/// with no zlib or gzip framing.
///
/// # Errors
///
/// - [`ExtractionError::UnsupportedMethod`] for anything but stored/deflate
/// - [`ExtractionError::CorruptData`] if the stream is malformed or the
///   output length differs from `expected_size`
pub fn decompress(method: CompressionMethod, data: &[u8], expected_size: u64) -> Result<Vec<u8>> {
    match method {
        CompressionMethod::Stored => {
            if data.len() as u64 != expected_size {
                return Err(ExtractionError::corrupt(format!(
                    "stored payload is {} bytes, expected {expected_size}",
                    data.len()
                )));
            }
            Ok(data.to_vec())
        }
        CompressionMethod::Deflate => inflate(data, expected_size),
        CompressionMethod::Unknown(code) => Err(ExtractionError::UnsupportedMethod(format!(
            "compression method {code}"
        ))),
    }
}

fn inflate(data: &[u8], expected_size: u64) -> Result<Vec<u8>> {
    let capacity = usize::try_from(expected_size)
        .map_err(|_| ExtractionError::corrupt("declared size does not fit in memory"))?;
    let mut out = Vec::with_capacity(capacity.min(MAX_PREALLOC));

    // One byte past the declared size is enough to detect an overlong stream.
    let mut decoder = DeflateDecoder::new(data).take(expected_size.saturating_add(1));
    decoder
        .read_to_end(&mut out)
        .map_err(|e| ExtractionError::CorruptData {
            reason: "malformed deflate stream".to_string(),
            source: Some(e),
        })?;

    if out.len() as u64 > expected_size {
        return Err(ExtractionError::corrupt(format!(
            "deflate stream is longer than the declared {expected_size} bytes"
        )));
    }
    if out.len() as u64 != expected_size {
        return Err(ExtractionError::corrupt(format!(
            "deflate stream produced {} bytes, expected {expected_size}",
            out.len()
        )));
    }
    Ok(out)
}

/// Compare the CRC-32 of `data` with the value recorded in the directory.
pub fn verify_crc(data: &[u8], expected: u32) -> Result<()> {
    let mut crc = Crc::new();
    crc.update(data);
    let actual = crc.sum();
    if actual != expected {
        return Err(ExtractionError::corrupt(format!(
            "CRC-32 mismatch: computed {actual:08x}, expected {expected:08x}"
        )));
    }
    Ok(())
}
