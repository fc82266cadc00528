use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
};

use crate::AppState;

/// Streams a stored file back. Anything that cannot be served is a 404; read
/// failures other than a missing file are logged first.
pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> impl IntoResponse {
    match state.store.get(&filename).await {
        Ok(Some(file)) => {
            let mime_type = mime_guess::from_path(&filename).first_or_octet_stream();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime_type.to_string()),
                    (header::CONTENT_LENGTH, file.len.to_string()),
                ],
                Body::from_stream(file.body),
            )
                .into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::warn!(filename = %filename, error = %e, "Failed to open stored file");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
