//! Recommendation models
//!
//! A biased matrix factorisation for collaborative ratings, a bag-of-words
//! cosine index for content similarity, the evaluation metrics used to
//! compare them against simple baselines, and the hybrid recommender that
//! blends everything with the IMDB weighted scores.

pub mod content;
pub mod metrics;
pub mod recommender;
pub mod svd;

pub use content::ContentIndex;
pub use recommender::MlRecommender;
pub use svd::{SvdModel, SvdParams};
