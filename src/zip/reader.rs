use flate2::Crc;
use std::sync::Arc;

use crate::error::{Result, ZipError};
use crate::io::ReadAt;

use super::codec;
use super::structures::{CompressionMethod, LFH_SIZE, LocalFileHeader, ZipFileEntry};

/// Reads entry bodies through their local file headers.
///
/// Every failure here concerns a single entry; the directory and the other
/// entries stay usable.
pub struct EntryReader<R: ReadAt + ?Sized> {
    reader: Arc<R>,
}

impl<R: ReadAt + ?Sized> EntryReader<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self { reader }
    }

    /// Get the actual data offset for a file entry.
    ///
    /// The local header's name and extra field lengths may differ from the
    /// central directory's, so they are read from the local header itself.
    /// The local name must match the central directory name byte for byte.
    pub async fn data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let lfh_buf = self.reader.read_exact_at(entry.lfh_offset, LFH_SIZE).await?;
        let header = LocalFileHeader::from_bytes(&lfh_buf).map_err(|_| {
            ZipError::format(format!("bad local file header for {}", entry.file_name))
        })?;

        let name_offset = entry.lfh_offset + LFH_SIZE as u64;
        let local_name = self
            .reader
            .read_exact_at(name_offset, header.file_name_length as usize)
            .await
            .map_err(|_| {
                ZipError::format(format!("local header of {} is truncated", entry.file_name))
            })?;
        if local_name != entry.raw_name {
            return Err(ZipError::format(format!(
                "local header names {:?}, central directory names {:?}",
                String::from_utf8_lossy(&local_name),
                entry.file_name
            )));
        }

        Ok(entry.lfh_offset + header.header_len())
    }

    /// Read and decompress an entry.
    ///
    /// `max_length == 0` reads everything. Otherwise at most `max_length`
    /// bytes are produced, and they are exactly the start of the full
    /// content. Only complete reads can be checked against the recorded
    /// CRC32; a mismatch fails with [`ZipError::Integrity`].
    pub async fn read(&self, entry: &ZipFileEntry, max_length: u64) -> Result<Vec<u8>> {
        if entry.is_encrypted() {
            return Err(ZipError::Encrypted(entry.file_name.clone()));
        }
        if let CompressionMethod::Unknown(method) = entry.compression_method {
            return Err(ZipError::UnsupportedMethod {
                name: entry.file_name.clone(),
                method,
            });
        }

        let data_offset = self.data_offset(entry).await?;
        let limit = (max_length > 0 && max_length < entry.uncompressed_size).then_some(max_length);

        // Stored bodies map output bytes to input bytes one to one, so the
        // cap applies before reading.
        let to_read = match (entry.compression_method, limit) {
            (CompressionMethod::Stored, Some(cap)) => cap.min(entry.compressed_size),
            _ => entry.compressed_size,
        };
        let compressed = self
            .reader
            .read_exact_at(data_offset, to_read as usize)
            .await
            .map_err(|err| match err {
                ZipError::OutOfBounds { .. } => ZipError::format(format!(
                    "data of {} extends past end of archive",
                    entry.file_name
                )),
                other => other,
            })?;

        log::trace!(
            "read {} compressed bytes of {} at offset {}",
            compressed.len(),
            entry.file_name,
            data_offset
        );

        let data = codec::decompress(
            &entry.file_name,
            entry.compression_method,
            &compressed,
            entry.uncompressed_size,
            limit,
        )?;

        match limit {
            Some(cap) if data.len() as u64 != cap => Err(ZipError::Decode {
                name: entry.file_name.clone(),
                reason: format!("stream ended after {} of {} bytes", data.len(), cap),
            }),
            Some(_) => Ok(data),
            None => {
                verify(entry, &data)?;
                Ok(data)
            }
        }
    }
}

fn verify(entry: &ZipFileEntry, data: &[u8]) -> Result<()> {
    if data.len() as u64 != entry.uncompressed_size {
        return Err(ZipError::Decode {
            name: entry.file_name.clone(),
            reason: format!(
                "produced {} bytes, central directory records {}",
                data.len(),
                entry.uncompressed_size
            ),
        });
    }

    let mut crc = Crc::new();
    crc.update(data);
    if crc.sum() != entry.crc32 {
        log::warn!(
            "crc mismatch in {}: expected {:08x}, got {:08x}",
            entry.file_name,
            entry.crc32,
            crc.sum()
        );
        return Err(ZipError::Integrity {
            name: entry.file_name.clone(),
            expected: entry.crc32,
            actual: crc.sum(),
        });
    }
    Ok(())
}
