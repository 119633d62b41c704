use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{MovieId, Rating, UserId};

/// Hyper-parameters of the matrix factorisation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvdParams {
    pub n_factors: usize,
    pub n_epochs: usize,
    pub learning_rate: f64,
    pub regularization: f64,
    /// Standard deviation of the initial latent factors
    pub init_std: f64,
    pub seed: u64,
    pub rating_min: f64,
    pub rating_max: f64,
}

impl Default for SvdParams {
    fn default() -> Self {
        Self {
            n_factors: 100,
            n_epochs: 20,
            learning_rate: 0.005,
            regularization: 0.02,
            init_std: 0.1,
            seed: 42,
            rating_min: 0.5,
            rating_max: 5.0,
        }
    }
}

/// Biased matrix factorisation rating predictor
///
/// `r̂(u, i) = μ + b_u + b_i + q_i·p_u`, trained with stochastic gradient
/// descent over the ratings in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvdModel {
    params: SvdParams,
    global_mean: f64,
    user_index: HashMap<UserId, usize>,
    item_index: HashMap<MovieId, usize>,
    user_bias: Vec<f64>,
    item_bias: Vec<f64>,
    user_factors: Vec<Vec<f64>>,
    item_factors: Vec<Vec<f64>>,
}

/// Standard normal sample via Box-Muller
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl SvdModel {
    /// Fits the model on a set of ratings
    pub fn train(ratings: &[Rating], params: SvdParams) -> AppResult<Self> {
        if ratings.is_empty() {
            return Err(AppError::Model("cannot train on an empty ratings set".to_string()));
        }
        if params.n_factors == 0 || params.rating_min > params.rating_max {
            return Err(AppError::Model(format!("invalid parameters: {:?}", params)));
        }

        let mut user_index = HashMap::new();
        let mut item_index = HashMap::new();
        let mut samples = Vec::with_capacity(ratings.len());
        for r in ratings {
            let next_user = user_index.len();
            let u = *user_index.entry(r.user_id).or_insert(next_user);
            let next_item = item_index.len();
            let i = *item_index.entry(r.movie_id).or_insert(next_item);
            samples.push((u, i, r.rating));
        }

        let global_mean = ratings.iter().map(|r| r.rating).sum::<f64>() / ratings.len() as f64;

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut init = |count: usize| -> Vec<Vec<f64>> {
            (0..count)
                .map(|_| {
                    (0..params.n_factors)
                        .map(|_| standard_normal(&mut rng) * params.init_std)
                        .collect()
                })
                .collect()
        };
        let mut user_factors = init(user_index.len());
        let mut item_factors = init(item_index.len());
        let mut user_bias = vec![0.0; user_index.len()];
        let mut item_bias = vec![0.0; item_index.len()];

        let lr = params.learning_rate;
        let reg = params.regularization;

        for epoch in 0..params.n_epochs {
            let mut squared_error = 0.0;
            for &(u, i, rating) in &samples {
                let estimate =
                    global_mean + user_bias[u] + item_bias[i] + dot(&item_factors[i], &user_factors[u]);
                let err = rating - estimate;
                squared_error += err * err;

                user_bias[u] += lr * (err - reg * user_bias[u]);
                item_bias[i] += lr * (err - reg * item_bias[i]);

                for f in 0..params.n_factors {
                    let puf = user_factors[u][f];
                    let qif = item_factors[i][f];
                    user_factors[u][f] += lr * (err * qif - reg * puf);
                    item_factors[i][f] += lr * (err * puf - reg * qif);
                }
            }
            tracing::debug!(
                epoch,
                train_rmse = (squared_error / samples.len() as f64).sqrt(),
                "SVD epoch finished"
            );
        }

        tracing::info!(
            users = user_index.len(),
            items = item_index.len(),
            ratings = samples.len(),
            factors = params.n_factors,
            epochs = params.n_epochs,
            "Trained SVD model"
        );

        Ok(Self {
            params,
            global_mean,
            user_index,
            item_index,
            user_bias,
            item_bias,
            user_factors,
            item_factors,
        })
    }

    /// Estimated rating of `movie_id` by `user_id`, clipped to the rating scale
    ///
    /// Terms for an unknown user or movie are left out, so a completely
    /// unknown pair gets the global mean.
    pub fn predict(&self, user_id: UserId, movie_id: MovieId) -> f64 {
        let user = self.user_index.get(&user_id).copied();
        let item = self.item_index.get(&movie_id).copied();

        let mut estimate = self.global_mean;
        if let Some(u) = user {
            estimate += self.user_bias[u];
        }
        if let Some(i) = item {
            estimate += self.item_bias[i];
        }
        if let (Some(u), Some(i)) = (user, item) {
            estimate += dot(&self.item_factors[i], &self.user_factors[u]);
        }

        estimate.clamp(self.params.rating_min, self.params.rating_max)
    }

    /// Writes the model as JSON, creating parent directories as needed
    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)
            .map_err(|e| AppError::Model(format!("failed to serialize model: {}", e)))?;
        tracing::info!(path = %path.display(), "Saved SVD model");
        Ok(())
    }

    /// Every index must point at a bias and factor row, and every factor
    /// row must have `n_factors` entries
    fn check_dimensions(&self) -> Result<(), String> {
        if self.user_factors.len() != self.user_bias.len() {
            return Err("user factor and bias counts differ".to_string());
        }
        if self.item_factors.len() != self.item_bias.len() {
            return Err("item factor and bias counts differ".to_string());
        }
        let users = self.user_bias.len();
        if let Some((user, row)) = self.user_index.iter().find(|(_, row)| **row >= users) {
            return Err(format!("user {} points at missing row {}", user, row));
        }
        let items = self.item_bias.len();
        if let Some((movie, row)) = self.item_index.iter().find(|(_, row)| **row >= items) {
            return Err(format!("movie {} points at missing row {}", movie, row));
        }
        let n_factors = self.params.n_factors;
        if let Some(row) = self
            .user_factors
            .iter()
            .chain(&self.item_factors)
            .find(|row| row.len() != n_factors)
        {
            return Err(format!("factor row of length {}, expected {}", row.len(), n_factors));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        let model: Self = serde_json::from_reader(reader).map_err(|e| {
            AppError::Model(format!("failed to read model {}: {}", path.display(), e))
        })?;
        model.check_dimensions().map_err(|reason| {
            AppError::Model(format!("inconsistent model in {}: {}", path.display(), reason))
        })?;
        tracing::info!(
            path = %path.display(),
            users = model.user_index.len(),
            items = model.item_index.len(),
            "Loaded SVD model"
        );
        Ok(model)
    }
}
