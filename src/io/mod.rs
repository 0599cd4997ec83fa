//! Positioned-read sources backing an archive.
//!
//! The engine never keeps a read cursor: every logical operation issues its
//! own `read_at` calls, so one source can serve concurrent readers.

mod http;
mod local;

pub use http::{HttpConfig, HttpRangeReader};
pub use local::LocalFileReader;

use async_trait::async_trait;

use crate::error::{Result, ZipError};

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Fails with [`ZipError::OutOfBounds`] when the range ends past
    /// [`size`](ReadAt::size), and with an unexpected-EOF [`ZipError::Io`]
    /// when the source returns fewer bytes than it advertised.
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let size = self.size();
        let end = offset.checked_add(len as u64);
        if end.is_none_or(|end| end > size) {
            return Err(ZipError::OutOfBounds {
                offset,
                len: len as u64,
                size,
            });
        }

        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..]).await?;
            if n == 0 {
                return Err(ZipError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("short read at offset {}", offset + filled as u64),
                )));
            }
            filled += n;
        }
        Ok(buf)
    }
}
