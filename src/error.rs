use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::storage::StorageError;
use crate::upload::UploadBodyError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("No file uploaded")]
    NoFileUploaded,

    #[error("Invalid multipart body: {message}")]
    Multipart { message: String },

    #[error("Upload larger than {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Storage error: {source}")]
    Storage {
        message: String,
        #[source]
        source: StorageError,
    },

    #[error("Configuration error in {field}: {message}")]
    Config { field: String, message: String },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let message = match &err {
            StorageError::Incoming { source, .. } => {
                return match source
                    .get_ref()
                    .and_then(|e| e.downcast_ref::<UploadBodyError>())
                {
                    Some(UploadBodyError::TooLarge { limit }) => {
                        Self::PayloadTooLarge { limit: *limit }
                    }
                    Some(UploadBodyError::Multipart(message)) => Self::Multipart {
                        message: message.clone(),
                    },
                    None => Self::Multipart {
                        message: source.to_string(),
                    },
                };
            }
            StorageError::List { .. } => "Read uploads directory failed",
            StorageError::Read { .. } => "Read stored file failed",
            StorageError::Write { .. } | StorageError::CreateDir { .. } => {
                "Save uploaded file failed"
            }
        };
        Self::Storage {
            message: message.to_string(),
            source: err,
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Self::Multipart {
            message: err.body_text(),
        }
    }
}

impl AppError {
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NoFileUploaded | Self::Multipart { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Storage { .. } | Self::Config { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message placed in the `error` field of the response body.
    pub fn user_message(&self) -> String {
        match self {
            Self::NoFileUploaded => "No file uploaded".to_string(),
            Self::Multipart { message } => message.clone(),
            Self::PayloadTooLarge { limit } => {
                format!("File exceeds maximum upload size of {} bytes", limit)
            }
            Self::Storage { message, .. } => message.clone(),
            Self::Config { .. } | Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            Self::Storage { .. } | Self::Config { .. } | Self::Internal(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Self::NoFileUploaded | Self::Multipart { .. } | Self::PayloadTooLarge { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let body = json!({ "error": self.user_message() });
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn list_failure_maps_to_read_directory_message() {
        let err: AppError = StorageError::List {
            path: PathBuf::from("uploads"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        }
        .into();

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Read uploads directory failed");
    }

    #[test]
    fn missing_file_is_a_client_error() {
        let err = AppError::NoFileUploaded;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "No file uploaded");
    }

    #[test]
    fn config_errors_do_not_leak_details() {
        let err = AppError::config("PORT", "invalid digit found in string");
        assert_eq!(err.user_message(), "Internal server error");
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn interrupted_body_keeps_its_client_facing_cause() {
        let too_large: AppError = StorageError::Incoming {
            path: PathBuf::from("uploads/1-a.bin"),
            source: io::Error::other(UploadBodyError::TooLarge { limit: 10 }),
        }
        .into();
        assert_eq!(too_large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            too_large.user_message(),
            "File exceeds maximum upload size of 10 bytes"
        );

        let reset: AppError = StorageError::Incoming {
            path: PathBuf::from("uploads/1-a.bin"),
            source: io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"),
        }
        .into();
        assert_eq!(reset.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(reset.user_message(), "connection reset");
    }
}
