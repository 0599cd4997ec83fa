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
//!
//! Local headers are left to [`EntryReader`](super::EntryReader), which
//! visits them only when an entry is actually read.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::sync::Arc;

use crate::error::{Result, ZipError};
use crate::io::ReadAt;

use super::structures::*;

/// Extra field tag of the ZIP64 extended information block.
const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Location of the central directory, with offsets already adjusted for any
/// bytes prepended to the archive.
struct DirectoryLocation {
    offset: u64,
    size: u64,
    total_entries: u64,
    /// Length of data in front of the archive proper (self-extractor stubs).
    prefix: u64,
}

/// Low-level ZIP file parser.
///
/// Generic over the reader so the same code serves local files, HTTP
/// sources and `dyn ReadAt` trait objects.
///
/// ## Example
///
/// ```ignore
/// let parser = ZipParser::new(reader);
/// let entries = parser.list_files().await?;
/// ```
pub struct ZipParser<R: ReadAt + ?Sized> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt + ?Sized> ZipParser<R> {
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Tries the comment-less layout first, then scans backwards through the
    /// last `22 + 65535` bytes, the furthest a comment can push the record.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCD record, offset of EOCD in file).
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        if self.size < EndOfCentralDirectory::SIZE as u64 {
            return Err(ZipError::format("file is too small to be a zip archive"));
        }

        let offset = self.size - EndOfCentralDirectory::SIZE as u64;
        let buf = self
            .reader
            .read_exact_at(offset, EndOfCentralDirectory::SIZE)
            .await?;
        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && buf[20..22] == [0, 0] {
            let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
            return Ok((eocd, offset));
        }

        let search_size = ((EndOfCentralDirectory::MAX_COMMENT_SIZE
            + EndOfCentralDirectory::SIZE) as u64)
            .min(self.size);
        let search_start = self.size - search_size;
        let buf = self
            .reader
            .read_exact_at(search_start, search_size as usize)
            .await?;

        // Search backwards for EOCD signature (PK\x05\x06). A record whose
        // comment ends exactly at end of file wins outright; failing that, the
        // last record whose comment fits inside the file is used.
        let mut candidate = None;
        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] != EndOfCentralDirectory::SIGNATURE {
                continue;
            }
            let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;
            let record_end = i + EndOfCentralDirectory::SIZE + comment_len;
            if record_end == buf.len() {
                candidate = Some(i);
                break;
            }
            if record_end < buf.len() && candidate.is_none() {
                candidate = Some(i);
            }
        }

        if let Some(i) = candidate {
            let eocd = EndOfCentralDirectory::from_bytes(&buf[i..i + EndOfCentralDirectory::SIZE])?;
            return Ok((eocd, search_start + i as u64));
        }

        Err(ZipError::format("end of central directory record not found"))
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// Called when the regular EOCD indicates ZIP64 extensions are needed
    /// (fields set to 0xFFFF or 0xFFFFFFFF).
    pub async fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD> {
        // The ZIP64 EOCD Locator is located immediately before the regular EOCD
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or_else(|| ZipError::format("zip64 locator missing"))?;
        let locator_buf = self
            .reader
            .read_exact_at(locator_offset, Zip64EOCDLocator::SIZE)
            .await?;
        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;
        if locator.total_disks > 1 {
            return Err(ZipError::format("multi-volume archives are not supported"));
        }

        let eocd64_buf = self
            .reader
            .read_exact_at(locator.eocd64_offset, Zip64EOCD::MIN_SIZE)
            .await
            .map_err(truncated("zip64 end of central directory"))?;

        let eocd64 = Zip64EOCD::from_bytes(&eocd64_buf)?;
        if eocd64.disk_number != 0 || eocd64.disk_with_cd != 0 {
            return Err(ZipError::format("multi-volume archives are not supported"));
        }
        Ok(eocd64)
    }

    async fn locate_directory(&self) -> Result<DirectoryLocation> {
        let (eocd, eocd_offset) = self.find_eocd().await?;
        if eocd.is_multi_volume() {
            return Err(ZipError::format("multi-volume archives are not supported"));
        }

        let location = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset).await?;
            DirectoryLocation {
                offset: eocd64.cd_offset,
                size: eocd64.cd_size,
                total_entries: eocd64.total_entries,
                prefix: 0,
            }
        } else {
            // The directory ends where the EOCD starts; any gap between the
            // recorded end and the real one is data prepended to the archive.
            let recorded_end = eocd.cd_offset as u64 + eocd.cd_size as u64;
            let prefix = eocd_offset.checked_sub(recorded_end).ok_or_else(|| {
                ZipError::format("central directory overlaps the end record")
            })?;
            if prefix > 0 {
                log::debug!("archive is preceded by {} bytes of foreign data", prefix);
            }
            DirectoryLocation {
                offset: eocd.cd_offset as u64 + prefix,
                size: eocd.cd_size as u64,
                total_entries: eocd.total_entries as u64,
                prefix,
            }
        };

        if location
            .offset
            .checked_add(location.size)
            .is_none_or(|end| end > self.size)
        {
            return Err(ZipError::format("central directory extends past end of file"));
        }
        if location.total_entries.saturating_mul(CDFH_MIN_SIZE as u64) > location.size {
            return Err(ZipError::format(format!(
                "{} entries cannot fit in a {} byte central directory",
                location.total_entries, location.size
            )));
        }

        Ok(location)
    }

    /// List all files in the ZIP archive, in central directory order.
    ///
    /// Fails with [`ZipError::Format`] when a header signature is wrong,
    /// the directory holds fewer headers than the EOCD declares, or an
    /// entry points outside the archive.
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        let location = self.locate_directory().await?;

        // Read the entire Central Directory in one request
        // (efficient for HTTP as it's a single Range request)
        let cd_data = self
            .reader
            .read_exact_at(location.offset, location.size as usize)
            .await?;

        let mut entries = Vec::with_capacity(location.total_entries as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for index in 0..location.total_entries {
            let entry = self
                .parse_cdfh(&mut cursor, location.prefix)
                .map_err(|err| match err {
                    ZipError::Io(_) => ZipError::format(format!(
                        "central directory truncated after {} of {} entries",
                        index, location.total_entries
                    )),
                    other => other,
                })?;
            entries.push(entry);
        }

        log::debug!(
            "parsed {} central directory entries at offset {}",
            entries.len(),
            location.offset
        );
        Ok(entries)
    }

    /// Parse a Central Directory File Header from a cursor.
    ///
    /// `prefix` is added to the recorded local header offset.
    fn parse_cdfh(&self, cursor: &mut Cursor<&[u8]>, prefix: u64) -> Result<ZipFileEntry> {
        let mut sig = [0u8; 4];
        cursor.read_exact(&mut sig)?;
        if sig != CDFH_SIGNATURE {
            return Err(ZipError::format(format!(
                "bad central directory header signature at directory offset {}",
                cursor.position() - 4
            )));
        }

        let _version_made_by = cursor.read_u16::<LittleEndian>()?;
        let _version_needed = cursor.read_u16::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let last_mod_time = cursor.read_u16::<LittleEndian>()?;
        let last_mod_date = cursor.read_u16::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let file_name_length = cursor.read_u16::<LittleEndian>()?;
        let extra_field_length = cursor.read_u16::<LittleEndian>()?;
        let file_comment_length = cursor.read_u16::<LittleEndian>()?;
        let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
        let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let _external_attrs = cursor.read_u32::<LittleEndian>()?;
        let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

        let mut raw_name = vec![0u8; file_name_length as usize];
        cursor.read_exact(&mut raw_name)?;
        let file_name = String::from_utf8_lossy(&raw_name).into_owned();
        let is_directory = raw_name.last() == Some(&b'/');

        let mut extra_bytes = vec![0u8; extra_field_length as usize];
        cursor.read_exact(&mut extra_bytes)?;
        let mut extra = Cursor::new(extra_bytes.as_slice());

        while extra.position() + 4 <= extra_field_length as u64 {
            let header_id = extra.read_u16::<LittleEndian>()?;
            let field_size = extra.read_u16::<LittleEndian>()? as u64;
            let field_end = extra.position() + field_size;

            if header_id == ZIP64_EXTRA_ID {
                // Fields are present only if corresponding header field is 0xFFFFFFFF
                if uncompressed_size == 0xFFFFFFFF && extra.position() + 8 <= field_end {
                    uncompressed_size = extra.read_u64::<LittleEndian>()?;
                }
                if compressed_size == 0xFFFFFFFF && extra.position() + 8 <= field_end {
                    compressed_size = extra.read_u64::<LittleEndian>()?;
                }
                if lfh_offset == 0xFFFFFFFF && extra.position() + 8 <= field_end {
                    lfh_offset = extra.read_u64::<LittleEndian>()?;
                }
            }
            extra.set_position(field_end);
        }

        // Skip over the file comment (we don't use it)
        let comment_end = cursor.position() + file_comment_length as u64;
        if comment_end > cursor.get_ref().len() as u64 {
            return Err(ZipError::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }
        cursor.set_position(comment_end);

        let lfh_offset = lfh_offset
            .checked_add(prefix)
            .filter(|offset| offset.saturating_add(LFH_SIZE as u64) <= self.size)
            .ok_or_else(|| {
                ZipError::format(format!("local header of {} lies outside the archive", file_name))
            })?;
        if lfh_offset
            .checked_add(compressed_size)
            .is_none_or(|end| end > self.size)
        {
            return Err(ZipError::format(format!(
                "compressed size of {} overflows the archive",
                file_name
            )));
        }

        Ok(ZipFileEntry {
            raw_name,
            file_name,
            compression_method: CompressionMethod::from_u16(compression_method),
            compressed_size,
            uncompressed_size,
            crc32,
            lfh_offset,
            flags,
            last_mod_time,
            last_mod_date,
            is_directory,
        })
    }
}

/// Reads that run off the end of the source mean the structure being read
/// is damaged, not that the source failed.
fn truncated(what: &'static str) -> impl Fn(ZipError) -> ZipError {
    move |err| match err {
        ZipError::OutOfBounds { .. } => ZipError::format(format!("{} is truncated", what)),
        other => other,
    }
}
