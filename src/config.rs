use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::error::AppError;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";
pub const UPLOAD_DIR_NAME: &str = "uploads";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub upload_dir: PathBuf,
    /// The single browser origin allowed to call the API cross-origin.
    pub allowed_origin: String,
    pub max_upload_bytes: u64,
}

impl Config {
    /// Reads `PORT` from the environment; the upload directory is resolved
    /// against the current working directory.
    pub fn from_env() -> Result<Self, AppError> {
        let port = parse_port(env::var("PORT").ok().as_deref())?;
        let cwd = env::current_dir()
            .map_err(|e| AppError::config("upload_dir", format!("no working directory: {}", e)))?;

        Ok(Self {
            port,
            upload_dir: cwd.join(UPLOAD_DIR_NAME),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        })
    }

    pub fn with_upload_dir(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            port: DEFAULT_PORT,
            upload_dir: upload_dir.into(),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

fn parse_port(raw: Option<&str>) -> Result<u16, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(DEFAULT_PORT),
        Some(value) => value
            .parse::<u16>()
            .map_err(|e| AppError::config("PORT", format!("{:?} is not a valid port: {}", value, e))),
    }
}
