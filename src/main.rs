use std::sync::Arc;

use filmora::{
    config::Config,
    db::{create_redis_client, Cache},
    logging,
    ml::MlRecommender,
    routes::{create_router, AppState},
    services::{MetadataProvider, OmdbProvider, OpenAiEmbedder, QdrantStore, SemanticSearch},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init("filmora=info,tower_http=info");

    let config = Config::from_env()?;

    // Loading the tables and building the content index is CPU-bound
    let recommender = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || MlRecommender::from_config(&config)).await??
    };
    let recommender = Arc::new(recommender);

    let redis_client = create_redis_client(&config.redis_url)?;
    let (cache, cache_handle) = Cache::new(redis_client).await;

    let metadata = config.omdb_api_key.clone().map(|api_key| {
        Arc::new(OmdbProvider::new(
            Some(cache.clone()),
            api_key,
            config.omdb_api_url.clone(),
        )) as Arc<dyn MetadataProvider>
    });
    if metadata.is_none() {
        tracing::warn!("OMDB_API_KEY not set, metadata lookups disabled");
    }

    let search = match (&config.openai_api_key, &config.qdrant_url) {
        (Some(openai_key), Some(qdrant_url)) => {
            let embedder = OpenAiEmbedder::new(
                openai_key.clone(),
                config.openai_api_url.clone(),
                config.embedding_model.clone(),
            );
            let store = QdrantStore::new(
                qdrant_url.clone(),
                config.qdrant_api_key.clone(),
                config.qdrant_collection.clone(),
            );
            let mut search =
                SemanticSearch::new(Arc::new(embedder), Arc::new(store), recommender.movies())
                    .with_cache(cache.clone());
            if let Some(metadata) = &metadata {
                search = search.with_metadata(metadata.clone());
            }
            Some(Arc::new(search))
        }
        _ => {
            tracing::warn!("OPENAI_API_KEY or QDRANT_URL not set, semantic search disabled");
            None
        }
    };

    let state = Arc::new(AppState {
        recommender,
        metadata,
        search,
    });
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_handle.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
