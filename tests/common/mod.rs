#![allow(dead_code)]

use std::io::{Cursor, Write};

use rozip::ZipArchive;
use tempfile::NamedTempFile;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

pub const STORED: CompressionMethod = CompressionMethod::Stored;
pub const DEFLATED: CompressionMethod = CompressionMethod::Deflated;

/// Write an archive the way ordinary tools do. Names ending in `/` become
/// directory entries.
pub fn build_zip(entries: &[(&str, &[u8], CompressionMethod)], comment: Option<&str>) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data, method) in entries {
        let opts = SimpleFileOptions::default().compression_method(*method);
        if name.ends_with('/') {
            writer.add_directory(*name, opts).unwrap();
        } else {
            writer.start_file(*name, opts).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    if let Some(comment) = comment {
        writer.set_comment(comment);
    }
    writer.finish().unwrap().into_inner()
}

pub fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().unwrap();
    tmp.write_all(bytes).unwrap();
    tmp.flush().unwrap();
    tmp
}

/// Open `bytes` as an archive. Keep the returned file alive while the
/// archive is in use.
pub async fn open_bytes(bytes: &[u8]) -> (NamedTempFile, ZipArchive) {
    let tmp = write_temp(bytes);
    let archive = ZipArchive::new(tmp.path()).unwrap();
    archive.open().await.unwrap();
    (tmp, archive)
}

/// Offsets of every occurrence of `needle`.
pub fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, w)| *w == needle)
        .map(|(i, _)| i)
        .collect()
}

pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = flate2::Crc::new();
    crc.update(data);
    crc.sum()
}

pub fn lorem(len: usize) -> Vec<u8> {
    b"Lorem ipsum dolor sit amet, consectetur adipiscing elit. "
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}
