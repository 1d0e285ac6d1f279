use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use smartdoc_backend::{
    ai::GeminiClient,
    auth::EmailOwnerResolver,
    config::{AppConfig, StorageBackend},
    db,
    routes::create_router,
    s3,
    state::AppState,
    storage::{LocalStorage, ObjectStorage, S3Storage},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        storage_backend = ?config.storage_backend,
        model = %config.gemini_model,
        "loaded backend configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    db::run_migrations(&pool)?;

    let storage = build_storage(&config).await?;
    let ai = Arc::new(GeminiClient::new(&config));
    let owners = Arc::new(EmailOwnerResolver);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let state = AppState::new(pool, config, storage, ai, owners);
    let router = create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn build_storage(config: &AppConfig) -> anyhow::Result<Arc<dyn ObjectStorage>> {
    match config.storage_backend {
        StorageBackend::Local => Ok(Arc::new(LocalStorage::new(config.upload_dir.clone()))),
        StorageBackend::S3 => {
            let client = s3::build_client(config).await?;
            let bucket = s3::bucket_name(config)?;
            Ok(Arc::new(S3Storage::new(client, bucket)))
        }
    }
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
