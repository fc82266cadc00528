use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::AppError;
use crate::storage::FileEntry;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<FileEntry>,
}

pub async fn list_files(State(state): State<AppState>) -> Result<Json<FileListResponse>, AppError> {
    let files = state.store.list().await?;
    tracing::debug!(count = files.len(), "Listed uploads");
    Ok(Json(FileListResponse { files }))
}
