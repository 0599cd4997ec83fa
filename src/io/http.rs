use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::ReadAt;
use crate::error::{Result, ZipError};

/// Tunables for [`HttpRangeReader`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Attempts allowed for a range before giving up on timeouts and
    /// connection failures.
    pub max_retry: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retry: 10,
        }
    }
}

/// HTTP Range reader for remote ZIP files
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    max_retry: u32,
}

impl HttpRangeReader {
    /// Create a new HTTP Range reader
    ///
    /// This will send a HEAD request to verify Range support and get file size
    pub async fn new(url: String, config: &HttpConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        let resp = client.head(&url).send().await?;

        if !resp.status().is_success() {
            return Err(ZipError::Remote(format!(
                "HEAD {} failed with status {}",
                url,
                resp.status()
            )));
        }

        let accept_ranges = resp
            .headers()
            .get("accept-ranges")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none");

        if !accept_ranges.contains("bytes") {
            return Err(ZipError::Remote(
                "server does not support Range requests".to_string(),
            ));
        }

        let size = resp
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ZipError::Remote("server did not return Content-Length".to_string()))?;

        log::debug!("remote archive {} is {} bytes", url, size);

        Ok(Self {
            client,
            url,
            size,
            max_retry: config.max_retry,
        })
    }
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || offset >= self.size {
            return Ok(0);
        }

        let end = (offset + buf.len() as u64 - 1).min(self.size - 1);
        let expected_size = (end - offset + 1) as usize;

        let mut received = 0;
        let mut retry_count = 0;

        while received < expected_size {
            let current_start = offset + received as u64;
            let range = format!("bytes={}-{}", current_start, end);

            let result = self
                .client
                .get(&self.url)
                .header("Range", &range)
                .send()
                .await;

            match result {
                Ok(resp) => {
                    if resp.status() != StatusCode::PARTIAL_CONTENT {
                        return Err(ZipError::Remote(format!(
                            "range request {} answered with status {}",
                            range,
                            resp.status()
                        )));
                    }

                    let bytes = resp.bytes().await?;
                    if bytes.is_empty() {
                        return Err(ZipError::Remote(format!(
                            "empty body for range {}",
                            range
                        )));
                    }
                    let chunk_len = bytes.len().min(expected_size - received);
                    buf[received..received + chunk_len].copy_from_slice(&bytes[..chunk_len]);
                    received += chunk_len;
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= self.max_retry {
                        return Err(ZipError::Remote(format!(
                            "max retries exceeded for range {}",
                            range
                        )));
                    }
                    log::warn!(
                        "connection error, retry {}/{}: {}",
                        retry_count,
                        self.max_retry,
                        e
                    );
                    tokio::time::sleep(Duration::from_millis(500 * retry_count as u64)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(received)
    }

    fn size(&self) -> u64 {
        self.size
    }
}
