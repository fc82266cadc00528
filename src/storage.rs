//! Storage backends for uploaded files.
//!
//! The HTTP layer only talks to [`FileStore`]. [`DiskStore`] keeps every upload
//! as a plain file in one flat directory and treats the directory listing as the
//! index, so nothing besides the files themselves is persisted.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::stream::{BoxStream, StreamExt};
use serde::Serialize;
use tokio::{fs, io::AsyncWriteExt};
use tokio_util::io::ReaderStream;

/// URL prefix under which stored files are served.
pub const PUBLIC_MOUNT: &str = "/uploads";

/// Chunks of a file body, either arriving from a client or going back out.
pub type ByteStream<'a> = BoxStream<'a, io::Result<Bytes>>;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("failed to create storage directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The incoming body failed before it was fully stored.
    #[error("upload body for {path} failed: {source}")]
    Incoming {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read directory {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FileEntry {
    pub filename: String,
    pub url: String,
}

impl FileEntry {
    pub fn new(filename: impl Into<String>) -> Self {
        let filename = filename.into();
        Self {
            url: public_url(&filename),
            filename,
        }
    }
}

/// A stored file opened for reading.
pub struct StoredFile {
    pub len: u64,
    pub body: ByteStream<'static>,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist `data` under a freshly generated name and return its public URL.
    ///
    /// `original_name` must already be a plain file name, see
    /// [`sanitize_original_name`]. If `data` yields an error nothing is kept.
    async fn put<'a>(
        &self,
        data: ByteStream<'a>,
        original_name: &str,
    ) -> Result<String, StorageError>;

    async fn list(&self) -> Result<Vec<FileEntry>, StorageError>;

    /// `Ok(None)` if no regular file has that name.
    async fn get(&self, name: &str) -> Result<Option<StoredFile>, StorageError>;
}

pub fn public_url(filename: &str) -> String {
    format!("{}/{}", PUBLIC_MOUNT, filename)
}

/// `<epoch-ms>-<original>`. Two uploads of the same name within one
/// millisecond collide; the later write wins.
pub fn generated_name(epoch_ms: i64, original_name: &str) -> String {
    format!("{}-{}", epoch_ms, original_name)
}

/// Strip any directory part from a client supplied filename.
///
/// Returns `None` when nothing usable is left.
pub fn sanitize_original_name(raw: &str) -> Option<&str> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    if is_plain_name(name) {
        Some(name)
    } else {
        None
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Open the store at `root`, creating the directory and any missing parents.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: root.clone(),
                source,
            })?;
        tracing::debug!(path = %root.display(), "Storage directory ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Copy `data` into `file` chunk by chunk, returning the number of bytes written.
async fn write_stream(
    file: &mut fs::File,
    data: &mut ByteStream<'_>,
    path: &Path,
) -> Result<u64, StorageError> {
    let write_err = |source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut size = 0u64;
    while let Some(chunk) = data.next().await {
        let chunk = chunk.map_err(|source| StorageError::Incoming {
            path: path.to_path_buf(),
            source,
        })?;
        file.write_all(&chunk).await.map_err(write_err)?;
        size += chunk.len() as u64;
    }
    file.flush().await.map_err(write_err)?;
    Ok(size)
}

/// Remove a partially written upload.
async fn discard(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed incomplete upload"),
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Failed to remove incomplete upload"
        ),
    }
}

#[async_trait]
impl FileStore for DiskStore {
    async fn put<'a>(
        &self,
        mut data: ByteStream<'a>,
        original_name: &str,
    ) -> Result<String, StorageError> {
        let filename = generated_name(Utc::now().timestamp_millis(), original_name);
        let path = self.root.join(&filename);

        let mut file = fs::File::create(&path)
            .await
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;

        match write_stream(&mut file, &mut data, &path).await {
            Ok(size) => {
                tracing::info!(filename = %filename, size, "Stored upload");
                Ok(public_url(&filename))
            }
            Err(err) => {
                drop(file);
                discard(&path).await;
                Err(err)
            }
        }
    }

    async fn list(&self) -> Result<Vec<FileEntry>, StorageError> {
        let list_err = |source| StorageError::List {
            path: self.root.clone(),
            source,
        };

        let mut dir = fs::read_dir(&self.root).await.map_err(list_err)?;
        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(list_err)? {
            entries.push(FileEntry::new(entry.file_name().to_string_lossy()));
        }
        Ok(entries)
    }

    async fn get(&self, name: &str) -> Result<Option<StoredFile>, StorageError> {
        if !is_plain_name(name) {
            return Ok(None);
        }
        let path = self.root.join(name);
        let read_err = |source| StorageError::Read {
            path: path.clone(),
            source,
        };

        let meta = match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(read_err(e)),
        };
        let file = fs::File::open(&path).await.map_err(read_err)?;

        Ok(Some(StoredFile {
            len: meta.len(),
            body: ReaderStream::new(file).boxed(),
        }))
    }
}
