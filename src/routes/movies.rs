use axum::{
    extract::State,
    Json,
};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{MovieId, OmdbMovie, SimilarMovie},
    routes::{
        extract::{ApiPath, ApiQuery},
        AppState, LimitQuery, DEFAULT_LIMIT,
    },
    services::recommendations,
};

/// Handler for content neighbours of a movie
pub async fn similar(
    State(state): State<Arc<AppState>>,
    ApiPath(movie_id): ApiPath<MovieId>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> AppResult<Json<Vec<SimilarMovie>>> {
    let limit = query.resolve(DEFAULT_LIMIT)?;
    let similar =
        recommendations::similar_movies(state.recommender.clone(), movie_id, limit).await?;
    Ok(Json(similar))
}

/// Handler for OMDb metadata by IMDB id
pub async fn metadata(
    State(state): State<Arc<AppState>>,
    ApiPath(imdb_id): ApiPath<String>,
) -> AppResult<Json<OmdbMovie>> {
    let provider = state
        .metadata
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Movie metadata is not configured".to_string()))?;
    let movie = provider.movie_metadata(&imdb_id).await?;
    Ok(Json(movie))
}
