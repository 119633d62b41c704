use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    ml::MlRecommender,
    models::{MovieId, PredictedRating, RecommendedMovie, SimilarMovie, UserId},
};

/// Runs a recommender call on the blocking pool
///
/// Content similarity scans every movie, so it stays off the async workers.
async fn run_blocking<T, F>(recommender: Arc<MlRecommender>, f: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce(&MlRecommender) -> AppResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&recommender))
        .await
        .map_err(|e| AppError::Internal(format!("Recommender task failed: {}", e)))?
}

/// Hybrid top-`limit` recommendations for a user
pub async fn recommend_for_user(
    recommender: Arc<MlRecommender>,
    user_id: UserId,
    limit: usize,
) -> AppResult<Vec<RecommendedMovie>> {
    run_blocking(recommender, move |r| r.hybrid_recommendation(user_id, limit)).await
}

/// Hybrid predicted rating of one movie for one user
pub async fn predict_rating(
    recommender: Arc<MlRecommender>,
    user_id: UserId,
    movie_id: MovieId,
) -> AppResult<PredictedRating> {
    run_blocking(recommender, move |r| {
        if r.movie(movie_id).is_none() && r.weighted_score(movie_id) == 0.0 {
            return Err(AppError::NotFound(format!("Movie {} not found", movie_id)));
        }
        Ok(r.hybrid_predicted_rating(user_id, movie_id))
    })
    .await
}

/// Content neighbours of a movie
pub async fn similar_movies(
    recommender: Arc<MlRecommender>,
    movie_id: MovieId,
    limit: usize,
) -> AppResult<Vec<SimilarMovie>> {
    run_blocking(recommender, move |r| {
        if r.movie(movie_id).is_none() {
            return Err(AppError::NotFound(format!("Movie {} not found", movie_id)));
        }
        Ok(r.similar_movies(movie_id, limit))
    })
    .await
}
