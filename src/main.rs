use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use reelgraph_api::{
    config::Config,
    db::{self, Cache},
    graph::{GraphStore, PgGraphStore},
    routes::{create_router, AppState},
    services::{EmbeddingStore, ScoreFusionEngine},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reelgraph_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    // Graph store
    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    db::run_migrations(&pool).await?;
    let graph: Arc<dyn GraphStore> = Arc::new(PgGraphStore::new(pool.clone()));

    // Embedding store, loaded once and shared read-only
    let cache_path = config.embedding_cache_path.clone();
    let embeddings = tokio::task::spawn_blocking(move || EmbeddingStore::load(cache_path)).await??;

    let engine = ScoreFusionEngine::new(graph.clone(), Arc::new(embeddings))
        .with_weights(config.fusion_weights())
        .with_provider_limit(config.provider_limit)
        .with_failure_policy(config.graph_failure_policy);

    // Response cache
    let (cache, cache_writer) = match &config.redis_url {
        Some(url) => {
            let (cache, handle) = Cache::new(db::create_redis_client(url)?);
            (Some(cache), Some(handle))
        }
        None => {
            tracing::info!("REDIS_URL not set, response cache disabled");
            (None, None)
        }
    };

    let address = config.bind_address();
    let app = create_router(AppState::new(engine, graph, cache, config));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }
    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
