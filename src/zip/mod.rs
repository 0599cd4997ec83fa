//! ZIP archive parsing, indexing and entry reading.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Locates and walks the central directory
//! - [`index`]: Optional hash index over entry names
//! - [`resolver`]: Name lookups and listings, with or without the index
//! - [`reader`]: Local header validation, decompression and CRC checks
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! The EOCD is read first (from the end of the file), then the Central
//! Directory, which allows listing files without reading the entire
//! archive.
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 end records and extended information fields
//! - STORED (no compression) method
//! - DEFLATE compression method
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

pub mod codec;
mod index;
mod parser;
mod reader;
mod resolver;
mod structures;

pub use index::NameIndex;
pub use parser::ZipParser;
pub use reader::EntryReader;
pub use resolver::EntryResolver;
pub use structures::*;
