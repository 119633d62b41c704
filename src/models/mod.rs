use serde::{Deserialize, Serialize};

pub mod omdb;
pub mod vector;

pub use omdb::{OmdbMovie, OmdbResponse};
pub use vector::{PointId, ScoredPoint, SearchHit, VectorPoint};

/// Kaggle/TMDB movie identifier
pub type MovieId = u64;

/// MovieLens user identifier
pub type UserId = u64;

// ============================================================================
// Prepared dataset rows
// ============================================================================

/// A single user rating from `ratings_df.csv`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "movieId")]
    pub movie_id: MovieId,
    pub rating: f64,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl Rating {
    pub fn new(user_id: UserId, movie_id: MovieId, rating: f64) -> Self {
        Self {
            user_id,
            movie_id,
            rating,
            timestamp: None,
        }
    }
}

/// A prepared movie from `movies_df.csv`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub bag_of_words: String,
}

/// IMDB-style weighted rating of a movie from `weighted_df.csv`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightedScore {
    pub id: MovieId,
    pub score: f64,
}

// ============================================================================
// Raw Kaggle rows
// ============================================================================

/// Row of the raw `movies_metadata.csv`
///
/// A handful of rows in the public dump are shifted by a column, so the id is
/// kept as text and numeric columns tolerate garbage.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMovieMetadata {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub genres: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub vote_count: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub vote_average: Option<f64>,
}

/// Row of the raw `credits.csv`
#[derive(Debug, Clone, Deserialize)]
pub struct RawCredits {
    #[serde(default)]
    pub cast: Option<String>,
    #[serde(default)]
    pub crew: Option<String>,
    pub id: String,
}

/// Row of the raw `keywords.csv`
#[derive(Debug, Clone, Deserialize)]
pub struct RawKeywords {
    pub id: String,
    #[serde(default)]
    pub keywords: Option<String>,
}

// ============================================================================
// API responses
// ============================================================================

/// A recommended movie returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendedMovie {
    pub movie_id: MovieId,
    pub title: Option<String>,
    pub imdb_id: Option<String>,
    pub score: f64,
}

/// A content neighbour of a movie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarMovie {
    pub movie_id: MovieId,
    pub title: String,
    pub imdb_id: Option<String>,
    pub similarity: f64,
}

/// Hybrid rating prediction with the components it was built from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictedRating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub collaborative: f64,
    /// Absent when the movie has no content neighbours
    pub content_based: Option<f64>,
    pub weighted: f64,
    pub rating: f64,
}

/// Response for the recommendations endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: UserId,
    pub recommendations: Vec<RecommendedMovie>,
}
