//! # rozip
//!
//! Read-only access to ZIP archives, treating an archive as a small
//! read-only filesystem.
//!
//! A [`ZipArchive`] is created closed from a local path (or an HTTP URL
//! served with Range requests), opened to parse the central directory, and
//! then queried: list names, test for existence with or without case
//! sensitivity, enumerate everything under a directory prefix, and read
//! entry contents, optionally capped to a prefix of the data.
//!
//! Lookups scan the directory until [`ZipArchive::build_hash_table`] is
//! called; after that they are hash lookups, at the price of listings no
//! longer following directory order.
//!
//! ## Features
//!
//! - Local files and HTTP/HTTPS URLs behind one positioned-read trait
//! - ZIP64 end records and extended information fields
//! - STORED and DEFLATE entries, CRC32 verified on complete reads
//! - Safe to share between tasks: one `Arc<ZipArchive>`, any number of readers
//!
//! ## Example
//!
//! ```no_run
//! use rozip::ZipArchive;
//!
//! #[tokio::main]
//! async fn main() -> rozip::Result<()> {
//!     let archive = ZipArchive::new("assets.zip")?;
//!     archive.open().await?;
//!     archive.build_hash_table().await?;
//!
//!     if let Some(data) = archive.read("textures/Logo.PNG", false, 0).await? {
//!         println!("logo is {} bytes", data.len());
//!     }
//!     for name in archive.subpaths("shaders/").await? {
//!         println!("{}", name);
//!     }
//!
//!     archive.close().await
//! }
//! ```

pub mod archive;
pub mod error;
pub mod io;
pub mod zip;

pub use archive::{ArchiveSource, ZipArchive};
pub use error::{Result, ZipError};
pub use io::{HttpConfig, HttpRangeReader, LocalFileReader, ReadAt};
pub use crate::zip::{CompressionMethod, ZipFileEntry};
