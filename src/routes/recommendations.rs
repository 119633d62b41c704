use axum::{
    extract::State,
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{MovieId, PredictedRating, RecommendationResponse, UserId},
    routes::{
        extract::{ApiPath, ApiQuery},
        AppState, LimitQuery, DEFAULT_LIMIT,
    },
    services::recommendations,
};

/// Handler for the hybrid recommendations endpoint
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    ApiPath(user_id): ApiPath<UserId>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let limit = query.resolve(DEFAULT_LIMIT)?;

    tracing::info!(
        request_id = %request_id,
        user_id,
        limit,
        "Processing recommendation request"
    );

    let recommendations =
        recommendations::recommend_for_user(state.recommender.clone(), user_id, limit).await?;

    tracing::info!(
        request_id = %request_id,
        results = recommendations.len(),
        "Recommendations completed"
    );

    Ok(Json(RecommendationResponse {
        user_id,
        recommendations,
    }))
}

/// Handler for the hybrid predicted rating of one movie
pub async fn predicted_rating(
    State(state): State<Arc<AppState>>,
    ApiPath((user_id, movie_id)): ApiPath<(UserId, MovieId)>,
) -> AppResult<Json<PredictedRating>> {
    let prediction =
        recommendations::predict_rating(state.recommender.clone(), user_id, movie_id).await?;
    Ok(Json(prediction))
}
