//! A small file-upload service.
//!
//! `POST /api/upload` stores one multipart file, `GET /api/files` lists the
//! storage directory and `GET /uploads/:filename` serves stored files back.

pub mod config;
pub mod download;
pub mod error;
pub mod files;
pub mod storage;
pub mod upload;

#[cfg(test)]
mod test_utils;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::{Config, DEFAULT_MAX_UPLOAD_BYTES};
use crate::download::download_file;
use crate::error::AppError;
use crate::files::list_files;
use crate::storage::{DiskStore, FileStore};
use crate::upload::upload_file;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FileStore>,
    /// Largest file part accepted by the upload handler.
    pub max_upload_bytes: u64,
}

impl AppState {
    pub fn new(store: impl FileStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

pub fn build_router(state: AppState, allowed_origin: &str) -> Result<Router, AppError> {
    let origin = HeaderValue::from_str(allowed_origin)
        .map_err(|e| AppError::config("allowed_origin", e.to_string()))?;
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::POST])
        .allow_headers(Any)
        .allow_origin(origin);

    let middleware_stack = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let router = Router::new()
        .route("/api/upload", post(upload_file))
        .route("/api/files", get(list_files))
        .route("/uploads/:filename", get(download_file))
        // the upload handler enforces its own per-file limit while streaming
        .layer(DefaultBodyLimit::disable())
        .layer(middleware_stack)
        .with_state(state);

    Ok(router)
}

/// Address the server is reachable at, as logged on startup.
pub fn server_url(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}

/// A service whose storage directory exists and whose listener is bound.
///
/// Both are acquired in [`UploadServer::bind`]; if either step fails no socket
/// is left listening.
pub struct UploadServer {
    listener: TcpListener,
    router: Router,
}

impl UploadServer {
    pub async fn bind(config: &Config) -> Result<Self, AppError> {
        let store = DiskStore::open(&config.upload_dir).await?;
        let state = AppState::new(store).with_max_upload_bytes(config.max_upload_bytes);
        let router = build_router(state, &config.allowed_origin)?;

        let listener = TcpListener::bind(config.bind_addr())
            .await
            .map_err(|e| AppError::Internal(format!("Failed to bind to port: {}", e)))?;

        Ok(Self { listener, router })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        self.listener
            .local_addr()
            .map_err(|e| AppError::Internal(format!("Failed to read local address: {}", e)))
    }

    pub async fn serve(self) -> Result<(), AppError> {
        let addr = self.local_addr()?;
        tracing::info!("Backend server running at {}", server_url(addr));

        axum::serve(self.listener, self.router)
            .await
            .map_err(|e| AppError::Internal(format!("Server error: {}", e)))
    }
}
