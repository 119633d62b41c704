//! Kaggle movies dataset handling
//!
//! Loading and writing the CSV tables, parsing the Python-literal list columns
//! of the raw dump, and turning the raw tables into the prepared movie table
//! and weighted scores the recommender consumes.

pub mod literal;
pub mod loader;
pub mod prepare;
pub mod weighted;

pub use literal::{parse_literal, Literal, LiteralError};
pub use loader::{load_movies, load_ratings, load_weighted_scores, save_rows};
pub use prepare::prepare_movies;
pub use weighted::weighted_scores;
