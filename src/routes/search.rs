use axum::{
    extract::State,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::SearchHit,
    routes::{extract::ApiQuery, AppState},
};

const DEFAULT_SEARCH_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
}

/// Handler for semantic movie search
pub async fn search(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<SearchQuery>,
) -> AppResult<Json<Vec<SearchHit>>> {
    let limit = super::LimitQuery {
        limit: params.limit,
    }
    .resolve(DEFAULT_SEARCH_LIMIT)?;
    if params.q.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Search query cannot be empty".to_string(),
        ));
    }
    let search = state
        .search
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Semantic search is not configured".to_string()))?;

    let hits = search.search(&params.q, limit).await?;
    Ok(Json(hits))
}
