use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use filmora::{
    config::Config,
    dataset::{
        load_movies, load_ratings,
        loader::{load_raw_credits, load_raw_keywords, load_raw_metadata},
        prepare::name_frequencies,
        prepare_movies, save_rows,
        weighted::{weighted_scores, DEFAULT_QUANTILE},
    },
    logging,
    ml::{
        metrics::{best_weighted_mean, rmse, train_test_split, user_item_mean_ratings},
        SvdModel, SvdParams,
    },
    services::{semantic::index_movies, OpenAiEmbedder, QdrantStore},
};

#[derive(Parser)]
#[command(name = "filmora-prepare")]
#[command(about = "Prepares datasets and models for the filmora recommender")]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build movies_df.csv and weighted_df.csv from the raw Kaggle files
    Movies {
        #[arg(long, default_value = "data/movies_metadata.csv")]
        metadata: PathBuf,
        #[arg(long, default_value = "data/credits.csv")]
        credits: PathBuf,
        #[arg(long, default_value = "data/keywords.csv")]
        keywords: PathBuf,
        #[arg(long, default_value = "data/movies_df.csv")]
        out_movies: PathBuf,
        #[arg(long, default_value = "data/weighted_df.csv")]
        out_weighted: PathBuf,
        /// Vote-count quantile a movie needs to get a weighted score
        #[arg(long, default_value_t = DEFAULT_QUANTILE)]
        quantile: f64,
    },
    /// Evaluate baselines and the SVD model, then train on all ratings
    Train {
        #[arg(long, default_value = "data/ratings_df.csv")]
        ratings: PathBuf,
        #[arg(long, default_value = "models/svd_model.json")]
        out: PathBuf,
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long)]
        epochs: Option<usize>,
        #[arg(long)]
        factors: Option<usize>,
    },
    /// Embed every movie's bag of words and upload it to Qdrant
    Index {
        #[arg(long, default_value = "data/movies_df.csv")]
        movies: PathBuf,
        #[arg(long, default_value_t = 64)]
        batch_size: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(if args.verbose {
        "filmora=debug,info"
    } else {
        "filmora=info"
    });

    match args.command {
        Command::Movies {
            metadata,
            credits,
            keywords,
            out_movies,
            out_weighted,
            quantile,
        } => {
            if !(0.0..=1.0).contains(&quantile) {
                anyhow::bail!("quantile must be within 0.0..=1.0, got {}", quantile);
            }
            let metadata = load_raw_metadata(&metadata)?;
            let credits = load_raw_credits(&credits)?;
            let keywords = load_raw_keywords(&keywords)?;

            let genres = name_frequencies(metadata.iter().map(|m| m.genres.as_deref()), "name");
            for (genre, count) in genres.iter().take(5) {
                tracing::info!(genre = %genre, count, "Top genre");
            }

            let movies = prepare_movies(&metadata, &credits, &keywords);
            save_rows(&out_movies, &movies)?;

            let scores = weighted_scores(&metadata, quantile);
            save_rows(&out_weighted, &scores)?;

            tracing::info!(
                movies = movies.len(),
                weighted = scores.len(),
                "Dataset preparation finished"
            );
        }
        Command::Train {
            ratings,
            out,
            test_fraction,
            seed,
            epochs,
            factors,
        } => {
            let ratings = load_ratings(&ratings)?;
            let defaults = SvdParams::default();
            let params = SvdParams {
                n_epochs: epochs.unwrap_or(defaults.n_epochs),
                n_factors: factors.unwrap_or(defaults.n_factors),
                seed,
                ..defaults
            };

            let (train, test) = train_test_split(&ratings, test_fraction, seed);
            if !train.is_empty() && !test.is_empty() {
                let rows = user_item_mean_ratings(&train, &test)?;
                let truth: Vec<f64> = rows.iter().map(|r| r.rating).collect();
                let user_item: Vec<f64> = rows.iter().map(|r| r.user_item_mean_rating).collect();
                let weighted = best_weighted_mean(&rows)?;

                let model = SvdModel::train(&train, params.clone())?;
                let svd: Vec<f64> = test
                    .iter()
                    .map(|r| model.predict(r.user_id, r.movie_id))
                    .collect();

                tracing::info!(
                    train = train.len(),
                    test = test.len(),
                    user_item_mean_rmse = rmse(&truth, &user_item)?,
                    weighted_mean_rmse = weighted.best_rmse,
                    weighted_mean_w = weighted.best_w,
                    svd_rmse = rmse(&truth, &svd)?,
                    "Held-out evaluation"
                );
            } else {
                tracing::warn!(ratings = ratings.len(), "Too few ratings for a held-out split");
            }

            let model = SvdModel::train(&ratings, params)?;
            model
                .save(&out)
                .with_context(|| format!("saving model to {}", out.display()))?;
        }
        Command::Index { movies, batch_size } => {
            let config = Config::from_env()?;
            let openai_key = config
                .openai_api_key
                .clone()
                .context("OPENAI_API_KEY must be set to index movies")?;
            let qdrant_url = config
                .qdrant_url
                .clone()
                .context("QDRANT_URL must be set to index movies")?;

            let embedder = OpenAiEmbedder::new(
                openai_key,
                config.openai_api_url.clone(),
                config.embedding_model.clone(),
            );
            let store = QdrantStore::new(
                qdrant_url,
                config.qdrant_api_key.clone(),
                config.qdrant_collection.clone(),
            );

            let movies = load_movies(&movies)?;
            let uploaded = index_movies(&embedder, &store, &movies, batch_size).await?;
            tracing::info!(uploaded, "Indexing finished");
        }
    }

    Ok(())
}
