//! The archive session: lifecycle, locking and the caller-facing API.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};

use crate::error::{Result, ZipError};
use crate::io::{HttpConfig, HttpRangeReader, LocalFileReader, ReadAt};
use crate::zip::{EntryReader, EntryResolver, NameIndex, ZipFileEntry, ZipParser};

/// Where an archive's bytes come from.
#[derive(Debug, Clone)]
pub enum ArchiveSource {
    Path(PathBuf),
    Url { url: String, config: HttpConfig },
}

impl ArchiveSource {
    async fn connect(&self) -> Result<Arc<dyn ReadAt>> {
        let reader: Arc<dyn ReadAt> = match self {
            ArchiveSource::Path(path) => Arc::new(LocalFileReader::new(path)?),
            ArchiveSource::Url { url, config } => {
                Arc::new(HttpRangeReader::new(url.clone(), config).await?)
            }
        };
        Ok(reader)
    }
}

/// Everything that only exists while the archive is open.
struct OpenArchive {
    reader: Arc<dyn ReadAt>,
    entries: Vec<ZipFileEntry>,
    index: OnceCell<NameIndex>,
}

impl OpenArchive {
    fn resolver(&self) -> EntryResolver<'_> {
        EntryResolver::new(&self.entries, self.index.get())
    }
}

/// A read-only ZIP archive that can be opened, queried and closed.
///
/// All methods take `&self`; share the archive between tasks with an
/// [`Arc`]. Opening and closing hold the state lock exclusively, so they
/// never overlap each other or any query. Queries and reads share the lock
/// for their whole duration, which keeps the source alive under them.
pub struct ZipArchive {
    source: ArchiveSource,
    state: RwLock<Option<OpenArchive>>,
}

impl ZipArchive {
    /// Create a closed archive for a local file.
    ///
    /// Fails with [`ZipError::PathNotFound`] unless `path` names an existing
    /// regular file.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(ZipError::PathNotFound(path.to_path_buf())),
        }
        Ok(Self::with_source(ArchiveSource::Path(path.to_path_buf())))
    }

    /// Create a closed archive read over HTTP Range requests.
    ///
    /// Nothing is fetched until [`open`](Self::open).
    pub fn from_url(url: impl Into<String>) -> Self {
        Self::from_url_with(url, HttpConfig::default())
    }

    pub fn from_url_with(url: impl Into<String>, config: HttpConfig) -> Self {
        Self::with_source(ArchiveSource::Url {
            url: url.into(),
            config,
        })
    }

    fn with_source(source: ArchiveSource) -> Self {
        Self {
            source,
            state: RwLock::new(None),
        }
    }

    pub fn source(&self) -> &ArchiveSource {
        &self.source
    }

    /// Open the source and parse its central directory.
    ///
    /// On failure the archive stays closed.
    pub async fn open(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if state.is_some() {
            return Err(ZipError::AlreadyOpen);
        }

        let reader = self.source.connect().await?;
        let entries = ZipParser::new(reader.clone()).list_files().await?;
        log::debug!("opened {:?} with {} entries", self.source, entries.len());

        *state = Some(OpenArchive {
            reader,
            entries,
            index: OnceCell::new(),
        });
        Ok(())
    }

    pub async fn is_open(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Close the archive, dropping the source handle, the entries and the
    /// hash table.
    pub async fn close(&self) -> Result<()> {
        let mut state = self.state.write().await;
        match state.take() {
            Some(_) => {
                log::debug!("closed {:?}", self.source);
                Ok(())
            }
            None => Err(ZipError::NotOpen),
        }
    }

    /// Build the name index used for constant-time lookups.
    ///
    /// Built once per open; later calls return immediately, and concurrent
    /// callers wait for the one doing the work. Listings come out in hash
    /// order from then on.
    pub async fn build_hash_table(&self) -> Result<()> {
        let state = self.state.read().await;
        let open = state.as_ref().ok_or(ZipError::NotOpen)?;
        open.index
            .get_or_init(|| async {
                let index = NameIndex::build(&open.entries);
                log::debug!("built hash table over {} names", index.len());
                index
            })
            .await;
        Ok(())
    }

    /// Whether the hash table is built. Always `false` while closed.
    pub async fn has_hash_table(&self) -> bool {
        self.state
            .read()
            .await
            .as_ref()
            .is_some_and(|open| open.index.initialized())
    }

    async fn with_open<T>(&self, f: impl FnOnce(&OpenArchive) -> T) -> Result<T> {
        let state = self.state.read().await;
        state.as_ref().map(f).ok_or(ZipError::NotOpen)
    }

    /// All entry names: directory order without a hash table, hash order
    /// with one.
    pub async fn file_names(&self) -> Result<Vec<String>> {
        self.with_open(|open| open.resolver().list_names()).await
    }

    /// Name of the first entry in the central directory.
    pub async fn first_file_name(&self) -> Result<Option<String>> {
        self.with_open(|open| open.resolver().first_name()).await
    }

    pub async fn file_exists(&self, name: &str, case_sensitive: bool) -> Result<bool> {
        self.with_open(|open| open.resolver().exists(name, case_sensitive))
            .await
    }

    /// Names beginning with `prefix`, in directory order.
    pub async fn subpaths(&self, prefix: &str) -> Result<Vec<String>> {
        self.with_open(|open| open.resolver().subpaths(prefix)).await
    }

    pub async fn entry(&self, name: &str, case_sensitive: bool) -> Result<Option<ZipFileEntry>> {
        self.with_open(|open| open.resolver().find(name, case_sensitive).cloned())
            .await
    }

    /// Entry metadata in directory order.
    pub async fn entries(&self) -> Result<Vec<ZipFileEntry>> {
        self.with_open(|open| open.entries.clone()).await
    }

    pub async fn len(&self) -> Result<usize> {
        self.with_open(|open| open.entries.len()).await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        self.with_open(|open| open.entries.is_empty()).await
    }

    /// Read an entry's content, or `None` if no entry has that name.
    ///
    /// `max_length == 0` reads the whole entry; otherwise the result is the
    /// first `max_length` bytes. Errors concerning the entry itself leave the
    /// archive open and other entries readable.
    pub async fn read(
        &self,
        name: &str,
        case_sensitive: bool,
        max_length: u64,
    ) -> Result<Option<Vec<u8>>> {
        let state = self.state.read().await;
        let open = state.as_ref().ok_or(ZipError::NotOpen)?;
        let Some(entry) = open.resolver().find(name, case_sensitive) else {
            return Ok(None);
        };
        EntryReader::new(open.reader.clone())
            .read(entry, max_length)
            .await
            .map(Some)
    }
}
