use dotenv::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use upload_server::{config::Config, error::AppError, UploadServer};

fn init_tracing() -> Result<(), AppError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| AppError::Internal(format!("Failed to initialize tracing: {}", e)))
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenv().ok();
    init_tracing()?;

    let config = Config::from_env()?;
    tracing::info!(
        upload_dir = %config.upload_dir.display(),
        allowed_origin = %config.allowed_origin,
        "Starting upload server"
    );

    UploadServer::bind(&config).await?.serve().await
}
