use std::collections::HashMap;
use std::path::Path;

use crate::{
    config::Config,
    dataset::{load_movies, load_ratings, load_weighted_scores},
    error::{AppError, AppResult},
    models::{
        Movie, MovieId, PredictedRating, Rating, RecommendedMovie, SimilarMovie, UserId,
        WeightedScore,
    },
};

use super::{
    content::ContentIndex,
    svd::{SvdModel, SvdParams},
};

/// Neighbours averaged for the content-based rating
const CONTENT_NEIGHBOURS: usize = 10;

const COLLABORATIVE_WEIGHT: f64 = 0.5;
const CONTENT_WEIGHT: f64 = 0.2;
const POPULARITY_WEIGHT: f64 = 0.3;

/// Hybrid recommender combining the collaborative model, content similarity
/// and IMDB weighted scores
pub struct MlRecommender {
    model: SvdModel,
    /// Ratings per user, in file order
    ratings_by_user: HashMap<UserId, Vec<Rating>>,
    movies: Vec<Movie>,
    /// First row of each movie id in `movies`
    movie_rows: HashMap<MovieId, usize>,
    content: ContentIndex,
    weighted: HashMap<MovieId, f64>,
}

impl MlRecommender {
    pub fn new(
        model: SvdModel,
        ratings: Vec<Rating>,
        movies: Vec<Movie>,
        weighted: Vec<WeightedScore>,
    ) -> Self {
        let mut ratings_by_user: HashMap<UserId, Vec<Rating>> = HashMap::new();
        for rating in ratings {
            ratings_by_user.entry(rating.user_id).or_default().push(rating);
        }

        let mut movie_rows = HashMap::new();
        for (row, movie) in movies.iter().enumerate() {
            movie_rows.entry(movie.id).or_insert(row);
        }

        let mut weighted_by_id = HashMap::new();
        for score in weighted {
            weighted_by_id.entry(score.id).or_insert(score.score);
        }

        let content = ContentIndex::build(movies.iter().map(|m| m.bag_of_words.as_str()));

        Self {
            model,
            ratings_by_user,
            movies,
            movie_rows,
            content,
            weighted: weighted_by_id,
        }
    }

    /// Loads the tables named in the config and the persisted model
    ///
    /// When the model file is absent and `train_if_missing` is set, the model
    /// is trained on the full ratings table and saved for the next start.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let ratings = load_ratings(Path::new(&config.ratings_path))?;
        let movies = load_movies(Path::new(&config.movies_path))?;
        let weighted = load_weighted_scores(Path::new(&config.weighted_path))?;

        let model_path = Path::new(&config.model_path);
        let model = if model_path.exists() {
            SvdModel::load(model_path)?
        } else if config.train_if_missing {
            tracing::warn!(
                path = %model_path.display(),
                "Model file missing, training from ratings"
            );
            let model = SvdModel::train(&ratings, SvdParams::default())?;
            model.save(model_path)?;
            model
        } else {
            return Err(AppError::Model(format!(
                "model file {} not found",
                model_path.display()
            )));
        };

        Ok(Self::new(model, ratings, movies, weighted))
    }

    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    pub fn movie(&self, movie_id: MovieId) -> Option<&Movie> {
        self.movie_rows.get(&movie_id).map(|&row| &self.movies[row])
    }

    /// Model estimate for every movie the user rated, in file order
    pub fn user_rating_predictions(&self, user_id: UserId) -> Vec<(MovieId, f64)> {
        self.ratings_by_user
            .get(&user_id)
            .map(|ratings| {
                ratings
                    .iter()
                    .map(|r| (r.movie_id, self.model.predict(user_id, r.movie_id)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ids of the `n` best predictions; equal estimates keep their order
    pub fn top_collaborative(predictions: &[(MovieId, f64)], n: usize) -> Vec<MovieId> {
        let mut sorted = predictions.to_vec();
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
        sorted.into_iter().take(n).map(|(id, _)| id).collect()
    }

    /// Content neighbours of a movie, most similar first
    pub fn similar_movies(&self, movie_id: MovieId, n: usize) -> Vec<SimilarMovie> {
        let Some(&row) = self.movie_rows.get(&movie_id) else {
            tracing::warn!(movie_id, "Movie not found in movie table");
            return Vec::new();
        };

        self.content
            .similar(row, n)
            .into_iter()
            .map(|(other, similarity)| {
                let movie = &self.movies[other];
                SimilarMovie {
                    movie_id: movie.id,
                    title: movie.title.clone(),
                    imdb_id: movie.imdb_id.clone(),
                    similarity,
                }
            })
            .collect()
    }

    /// Weighted score or 0 when the movie was not scored
    pub fn weighted_score(&self, movie_id: MovieId) -> f64 {
        self.weighted.get(&movie_id).copied().unwrap_or(0.0)
    }

    /// Weighted scores for a list of ids, keeping the first position of repeats
    pub fn weighted_scores(&self, movie_ids: &[MovieId]) -> Vec<(MovieId, f64)> {
        let mut seen = std::collections::HashSet::new();
        movie_ids
            .iter()
            .filter(|id| seen.insert(**id))
            .map(|&id| (id, self.weighted_score(id)))
            .collect()
    }

    /// Sums half of each list's score per movie, in first-seen order
    pub fn combine_scores(
        collaborative: &[(MovieId, f64)],
        content: &[(MovieId, f64)],
    ) -> Vec<(MovieId, f64)> {
        let mut combined: Vec<(MovieId, f64)> = Vec::new();
        let mut positions: HashMap<MovieId, usize> = HashMap::new();

        for &(id, score) in collaborative.iter().chain(content) {
            match positions.get(&id) {
                Some(&pos) => combined[pos].1 += 0.5 * score,
                None => {
                    positions.insert(id, combined.len());
                    combined.push((id, 0.5 * score));
                }
            }
        }
        combined
    }

    /// Top `n` hybrid recommendations for a user
    ///
    /// Candidates are the user's best collaborative predictions plus the
    /// content neighbours of the last movie they rated; they are ranked by
    /// weighted score.
    pub fn hybrid_recommendation(
        &self,
        user_id: UserId,
        n: usize,
    ) -> AppResult<Vec<RecommendedMovie>> {
        let Some(last_rated) = self
            .ratings_by_user
            .get(&user_id)
            .and_then(|ratings| ratings.last())
        else {
            return Err(AppError::NotFound(format!("User {} has no ratings", user_id)));
        };

        let predictions = self.user_rating_predictions(user_id);
        let top_collaborative = Self::top_collaborative(&predictions, n);
        let top_content: Vec<MovieId> = self
            .similar_movies(last_rated.movie_id, n)
            .into_iter()
            .map(|m| m.movie_id)
            .collect();

        let mut combined = Self::combine_scores(
            &self.weighted_scores(&top_collaborative),
            &self.weighted_scores(&top_content),
        );
        combined.sort_by(|a, b| b.1.total_cmp(&a.1));
        combined.truncate(n);

        tracing::debug!(
            user_id,
            collaborative = top_collaborative.len(),
            content = top_content.len(),
            last_rated = last_rated.movie_id,
            "Built hybrid recommendation"
        );

        Ok(combined
            .into_iter()
            .map(|(movie_id, score)| {
                let movie = self.movie(movie_id);
                RecommendedMovie {
                    movie_id,
                    title: movie.map(|m| m.title.clone()),
                    imdb_id: movie.and_then(|m| m.imdb_id.clone()),
                    score,
                }
            })
            .collect())
    }

    pub fn collaborative_rating(&self, user_id: UserId, movie_id: MovieId) -> f64 {
        self.model.predict(user_id, movie_id)
    }

    /// Mean model estimate over the movie's closest content neighbours
    pub fn content_based_rating(&self, user_id: UserId, movie_id: MovieId) -> Option<f64> {
        let neighbours = self.similar_movies(movie_id, CONTENT_NEIGHBOURS);
        if neighbours.is_empty() {
            return None;
        }
        let total: f64 = neighbours
            .iter()
            .map(|m| self.model.predict(user_id, m.movie_id))
            .sum();
        Some(total / neighbours.len() as f64)
    }

    /// `0.5·collaborative + 0.2·content + 0.3·weighted`
    ///
    /// Movies without content neighbours use the collaborative estimate in
    /// place of the content component.
    pub fn hybrid_predicted_rating(&self, user_id: UserId, movie_id: MovieId) -> PredictedRating {
        let collaborative = self.collaborative_rating(user_id, movie_id);
        let content_based = self.content_based_rating(user_id, movie_id);
        let weighted = self.weighted_score(movie_id);

        let rating = COLLABORATIVE_WEIGHT * collaborative
            + CONTENT_WEIGHT * content_based.unwrap_or(collaborative)
            + POPULARITY_WEIGHT * weighted;

        PredictedRating {
            user_id,
            movie_id,
            collaborative,
            content_based,
            weighted,
            rating,
        }
    }
}
