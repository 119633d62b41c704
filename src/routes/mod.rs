use std::sync::Arc;

use axum::{http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    error::{AppError, AppResult},
    middleware::{make_span_with_request_id, request_id_middleware},
    ml::MlRecommender,
    services::{MetadataProvider, SemanticSearch},
};

pub mod extract;
pub mod movies;
pub mod recommendations;
pub mod search;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

/// Shared, read-only application state
pub struct AppState {
    pub recommender: Arc<MlRecommender>,
    /// Absent when no OMDb key is configured
    pub metadata: Option<Arc<dyn MetadataProvider>>,
    /// Absent unless both OpenAI and Qdrant are configured
    pub search: Option<Arc<SemanticSearch>>,
}

impl AppState {
    pub fn new(recommender: Arc<MlRecommender>) -> Self {
        Self {
            recommender,
            metadata: None,
            search: None,
        }
    }
}

/// `?limit=` query parameter shared by the list endpoints
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    /// Requested limit, or `default`, checked against `1..=100`
    pub fn resolve(&self, default: usize) -> AppResult<usize> {
        match self.limit.unwrap_or(default) {
            limit @ 1..=MAX_LIMIT => Ok(limit),
            other => Err(AppError::InvalidInput(format!(
                "limit must be between 1 and {}, got {}",
                MAX_LIMIT, other
            ))),
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            // outermost first: the request id must exist before the trace span
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/users/:user_id/recommendations",
            get(recommendations::recommend),
        )
        .route(
            "/users/:user_id/movies/:movie_id/rating",
            get(recommendations::predicted_rating),
        )
        .route("/movies/:movie_id/similar", get(movies::similar))
        .route("/movies/metadata/:imdb_id", get(movies::metadata))
        .route("/search", get(search::search))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "I am alive!" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_defaults_and_bounds() {
        assert_eq!(LimitQuery { limit: None }.resolve(DEFAULT_LIMIT).unwrap(), 10);
        assert_eq!(LimitQuery { limit: Some(100) }.resolve(DEFAULT_LIMIT).unwrap(), 100);
        assert!(LimitQuery { limit: Some(0) }.resolve(DEFAULT_LIMIT).is_err());
        assert!(LimitQuery { limit: Some(101) }.resolve(DEFAULT_LIMIT).is_err());
    }
}
