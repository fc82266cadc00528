use std::io;

use axum::{
    extract::{Multipart, State},
    Json,
};
use futures::stream::StreamExt;
use serde::Serialize;

use crate::error::AppError;
use crate::storage::sanitize_original_name;
use crate::AppState;

/// Multipart field the file is expected under.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Why an upload body stopped before it was fully received.
///
/// Travels through the store inside an `io::Error` and is recovered when the
/// storage error is turned into a response.
#[derive(thiserror::Error, Debug)]
pub enum UploadBodyError {
    #[error("{0}")]
    Multipart(String),

    #[error("File exceeds maximum upload size of {limit} bytes")]
    TooLarge { limit: u64 },
}

/// A request that is not `multipart/form-data` at all is treated the same as a
/// form without a file part.
///
/// Only the first `file` part with a usable filename is stored, written to the
/// store chunk by chunk. Every other field is dropped unread.
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Option<Multipart>,
) -> Result<Json<UploadResponse>, AppError> {
    let Some(mut multipart) = multipart else {
        return Err(AppError::NoFileUploaded);
    };

    let limit = state.max_upload_bytes;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(original_name) = field
            .file_name()
            .and_then(sanitize_original_name)
            .map(str::to_string)
        else {
            continue;
        };

        tracing::debug!(filename = %original_name, "Receiving upload");

        let mut received = 0u64;
        let body = field
            .map(move |chunk| {
                let chunk = chunk
                    .map_err(|e| io::Error::other(UploadBodyError::Multipart(e.body_text())))?;
                received += chunk.len() as u64;
                if received > limit {
                    tracing::warn!(received, limit, "Upload size limit exceeded, aborting");
                    return Err(io::Error::other(UploadBodyError::TooLarge { limit }));
                }
                Ok(chunk)
            })
            .boxed();

        let url = state.store.put(body, &original_name).await?;
        return Ok(Json(UploadResponse { url }));
    }

    Err(AppError::NoFileUploaded)
}
