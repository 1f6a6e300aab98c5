use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use article_recs::api::{create_router, AppState, RequestPolicy};
use article_recs::config::{Config, StoreBackend};
use article_recs::services::{ArtifactLoader, ArtifactStore, FsBlobStore, HttpBlobStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("article_recs=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn ArtifactStore> = match config.store_backend()? {
        StoreBackend::Http {
            base_url,
            sas_token,
        } => Arc::new(HttpBlobStore::new(base_url, sas_token, config.store_timeout())?),
        StoreBackend::Filesystem { root } => Arc::new(FsBlobStore::new(root)),
    };

    tracing::info!(
        store = store.name(),
        container = %config.artifact_container,
        model_blob = %config.model_blob,
        dataset_blob = %config.dataset_blob,
        "Loading artifacts"
    );

    let policy = RequestPolicy::from(&config);
    let loader = ArtifactLoader::new(store, config.artifact_keys());

    let state = AppState::from_startup(
        loader.load_recommender().await,
        config.startup_policy,
        policy,
    )
    .context("Failed to load recommendation artifacts")?;

    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
