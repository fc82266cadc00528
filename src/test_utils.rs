//! Helpers shared by the handler tests.

use std::path::Path;

use async_trait::async_trait;
use axum_test::TestServer;

use crate::storage::{ByteStream, DiskStore, FileEntry, FileStore, StorageError, StoredFile};
use crate::{build_router, config::DEFAULT_ALLOWED_ORIGIN, AppState};

/// Full router backed by a [`DiskStore`] rooted at `dir`.
pub async fn create_test_server(dir: &Path) -> TestServer {
    let store = DiskStore::open(dir).await.expect("Failed to open test store");
    create_test_server_with_store(store)
}

/// Like [`create_test_server`] but with a small per-file size limit.
pub async fn create_test_server_with_limit(dir: &Path, max_upload_bytes: u64) -> TestServer {
    let store = DiskStore::open(dir).await.expect("Failed to open test store");
    server_for(AppState::new(store).with_max_upload_bytes(max_upload_bytes))
}

pub fn create_test_server_with_store(store: impl FileStore + 'static) -> TestServer {
    server_for(AppState::new(store))
}

fn server_for(state: AppState) -> TestServer {
    let router = build_router(state, DEFAULT_ALLOWED_ORIGIN).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

pub fn entry_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

/// A store that holds nothing and accepts nothing.
pub struct NullStore;

#[async_trait]
impl FileStore for NullStore {
    async fn put<'a>(
        &self,
        _data: ByteStream<'a>,
        original_name: &str,
    ) -> Result<String, StorageError> {
        Err(StorageError::Write {
            path: original_name.into(),
            source: std::io::Error::from(std::io::ErrorKind::Unsupported),
        })
    }

    async fn list(&self) -> Result<Vec<FileEntry>, StorageError> {
        Ok(Vec::new())
    }

    async fn get(&self, _name: &str) -> Result<Option<StoredFile>, StorageError> {
        Ok(None)
    }
}
