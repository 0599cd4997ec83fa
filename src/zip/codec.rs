//! Decompression of entry bodies.

use flate2::read::DeflateDecoder;
use std::io::Read;

use crate::error::{Result, ZipError};

use super::structures::CompressionMethod;

/// Output buffers are never preallocated beyond this, whatever the entry
/// claims its size is.
const MAX_PREALLOC: u64 = 1 << 20;

/// Decompress one entry body.
///
/// `limit` caps the output length; inflation stops as soon as that many
/// bytes exist. Without a cap, inflation stops one byte past
/// `expected_size`, so a stream longer than recorded shows up as a length
/// mismatch instead of growing without bound.
pub fn decompress(
    name: &str,
    method: CompressionMethod,
    compressed: &[u8],
    expected_size: u64,
    limit: Option<u64>,
) -> Result<Vec<u8>> {
    match method {
        CompressionMethod::Stored => {
            let end = compressed.len().min(limit.map_or(usize::MAX, |cap| cap as usize));
            Ok(compressed[..end].to_vec())
        }
        CompressionMethod::Deflate => {
            let bound = limit.unwrap_or_else(|| expected_size.saturating_add(1));
            let capacity = bound
                .min((compressed.len() as u64).saturating_mul(4))
                .min(MAX_PREALLOC);
            let mut out = Vec::with_capacity(capacity as usize);
            DeflateDecoder::new(compressed)
                .take(bound)
                .read_to_end(&mut out)
                .map_err(|e| ZipError::Decode {
                    name: name.to_string(),
                    reason: e.to_string(),
                })?;
            Ok(out)
        }
        CompressionMethod::Unknown(method) => Err(ZipError::UnsupportedMethod {
            name: name.to_string(),
            method,
        }),
    }
}
