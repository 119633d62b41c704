//! Semantic movie search
//!
//! Bags of words are embedded with a text-embedding model and stored in a
//! vector collection keyed by movie id. A free-text query is embedded the
//! same way and answered with the nearest points, resolved against the movie
//! table and optionally enriched with OMDb metadata.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{Movie, MovieId, PointId, ScoredPoint, SearchHit, VectorPoint},
    services::metadata::MetadataProvider,
};

pub mod openai;
pub mod qdrant;

pub use openai::OpenAiEmbedder;
pub use qdrant::QdrantStore;

const EMBEDDING_CACHE_TTL: u64 = 604800; // 1 week

/// Turns texts into dense vectors
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a batch; the output order matches the input order
    async fn embed(&self, inputs: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Model name, part of the embedding cache key
    fn model(&self) -> &str;
}

/// Embeds a single query
pub async fn embed_query(embedder: &dyn EmbeddingProvider, query: &str) -> AppResult<Vec<f32>> {
    embedder
        .embed(&[query.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::ExternalApi("No embedding returned for query".to_string()))
}

/// A vector collection that stores and searches movie embeddings
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    async fn list_collections(&self) -> AppResult<Vec<String>>;

    /// Creates the collection with cosine distance unless it exists.
    /// Returns whether it was created.
    async fn ensure_collection(&self, dimension: usize) -> AppResult<bool>;

    async fn upload_points(&self, points: &[VectorPoint]) -> AppResult<()>;

    async fn search(&self, vector: &[f32], limit: usize) -> AppResult<Vec<ScoredPoint>>;

    fn collection(&self) -> &str;
}

/// Movie fields a search hit is resolved to
#[derive(Debug, Clone)]
struct CatalogEntry {
    title: String,
    imdb_id: Option<String>,
}

pub struct SemanticSearch {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    catalog: HashMap<MovieId, CatalogEntry>,
    metadata: Option<Arc<dyn MetadataProvider>>,
    cache: Option<Cache>,
}

impl SemanticSearch {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        movies: &[Movie],
    ) -> Self {
        let mut catalog = HashMap::new();
        for movie in movies {
            catalog.entry(movie.id).or_insert_with(|| CatalogEntry {
                title: movie.title.clone(),
                imdb_id: movie.imdb_id.clone(),
            });
        }
        Self {
            embedder,
            store,
            catalog,
            metadata: None,
            cache: None,
        }
    }

    /// Enriches hits that have an IMDB id with provider metadata
    pub fn with_metadata(mut self, metadata: Arc<dyn MetadataProvider>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Caches query embeddings
    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    async fn query_embedding(&self, query: &str) -> AppResult<Vec<f32>> {
        match &self.cache {
            Some(cache) => cached!(
                cache,
                CacheKey::Embedding {
                    model: self.embedder.model().to_string(),
                    query: query.to_string(),
                },
                EMBEDDING_CACHE_TTL,
                embed_query(self.embedder.as_ref(), query)
            ),
            None => embed_query(self.embedder.as_ref(), query).await,
        }
    }

    fn resolve(&self, point: ScoredPoint) -> SearchHit {
        let movie_id = point.id.as_movie_id();
        let entry = movie_id.and_then(|id| self.catalog.get(&id));
        let payload_str = |key: &str| {
            point
                .payload
                .as_ref()
                .and_then(|p| p.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        SearchHit {
            movie_id,
            title: entry.map(|e| e.title.clone()).or_else(|| payload_str("title")),
            imdb_id: entry
                .and_then(|e| e.imdb_id.clone())
                .or_else(|| payload_str("imdb_id")),
            score: point.score,
            metadata: None,
        }
    }

    /// Movies closest to a free-text query, best first
    pub async fn search(&self, query: &str, limit: usize) -> AppResult<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let vector = self.query_embedding(query).await?;
        let points = self.store.search(&vector, limit).await?;
        let mut hits: Vec<SearchHit> = points.into_iter().map(|p| self.resolve(p)).collect();

        if let Some(metadata) = &self.metadata {
            for hit in hits.iter_mut() {
                let Some(imdb_id) = hit.imdb_id.as_deref() else {
                    continue;
                };
                match metadata.movie_metadata(imdb_id).await {
                    Ok(movie) => hit.metadata = Some(movie),
                    Err(e) => tracing::warn!(
                        imdb_id = %imdb_id,
                        provider = metadata.name(),
                        error = %e,
                        "Skipping metadata enrichment"
                    ),
                }
            }
        }

        tracing::info!(query = %query, results = hits.len(), "Semantic search completed");
        Ok(hits)
    }
}

/// Embeds the bag of words of every movie and uploads them as points
///
/// The collection is created on the first batch, sized to the embedding
/// dimension. Movies with an empty bag of words are skipped. Returns the
/// number of uploaded points.
pub async fn index_movies(
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
    movies: &[Movie],
    batch_size: usize,
) -> AppResult<usize> {
    let indexable: Vec<&Movie> = movies
        .iter()
        .filter(|m| !m.bag_of_words.trim().is_empty())
        .collect();
    let mut uploaded = 0;
    let mut collection_ready = false;

    for batch in indexable.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|m| m.bag_of_words.clone()).collect();
        let vectors = embedder.embed(&texts).await?;

        if !collection_ready {
            let dimension = vectors.first().map(Vec::len).unwrap_or_default();
            store.ensure_collection(dimension).await?;
            collection_ready = true;
        }

        let points: Vec<VectorPoint> = batch
            .iter()
            .zip(vectors)
            .map(|(movie, vector)| VectorPoint {
                id: PointId::Num(movie.id),
                vector,
                payload: payload(movie),
            })
            .collect();
        store.upload_points(&points).await?;
        uploaded += points.len();

        tracing::info!(
            uploaded,
            total = indexable.len(),
            collection = store.collection(),
            "Indexed batch"
        );
    }

    Ok(uploaded)
}

fn payload(movie: &Movie) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("title".to_string(), json!(movie.title));
    if let Some(imdb_id) = &movie.imdb_id {
        payload.insert("imdb_id".to_string(), json!(imdb_id));
    }
    payload
}
