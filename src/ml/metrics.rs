use std::collections::HashMap;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::models::{MovieId, Rating, UserId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricsError {
    #[error("length mismatch: {truth} true values vs {predicted} predictions")]
    LengthMismatch { truth: usize, predicted: usize },

    #[error("no values to compare")]
    Empty,
}

/// Mean squared error
pub fn mse(truth: &[f64], predicted: &[f64]) -> Result<f64, MetricsError> {
    if truth.len() != predicted.len() {
        return Err(MetricsError::LengthMismatch {
            truth: truth.len(),
            predicted: predicted.len(),
        });
    }
    if truth.is_empty() {
        return Err(MetricsError::Empty);
    }
    let sum: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    Ok(sum / truth.len() as f64)
}

/// Root mean squared error
pub fn rmse(truth: &[f64], predicted: &[f64]) -> Result<f64, MetricsError> {
    mse(truth, predicted).map(f64::sqrt)
}

/// Baseline predictions for one held-out rating
#[derive(Debug, Clone, PartialEq)]
pub struct MeanRatingRow {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub rating: f64,
    pub global_mean_rating: f64,
    /// Falls back to the global mean for users absent from training
    pub user_mean_rating: f64,
    /// Falls back to the global mean for movies absent from training
    pub item_mean_rating: f64,
    pub user_item_mean_rating: f64,
}

fn means_by<K, F>(ratings: &[Rating], key: F) -> HashMap<K, f64>
where
    K: std::hash::Hash + Eq,
    F: Fn(&Rating) -> K,
{
    let mut sums: HashMap<K, (f64, usize)> = HashMap::new();
    for rating in ratings {
        let entry = sums.entry(key(rating)).or_insert((0.0, 0));
        entry.0 += rating.rating;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(k, (sum, count))| (k, sum / count as f64))
        .collect()
}

/// Predicts each test rating as the average of the user's and the movie's
/// mean training rating
pub fn user_item_mean_ratings(
    train: &[Rating],
    test: &[Rating],
) -> Result<Vec<MeanRatingRow>, MetricsError> {
    if train.is_empty() {
        return Err(MetricsError::Empty);
    }
    let global_mean = train.iter().map(|r| r.rating).sum::<f64>() / train.len() as f64;
    let user_means = means_by(train, |r| r.user_id);
    let item_means = means_by(train, |r| r.movie_id);

    Ok(test
        .iter()
        .map(|r| {
            let user_mean = user_means.get(&r.user_id).copied().unwrap_or(global_mean);
            let item_mean = item_means.get(&r.movie_id).copied().unwrap_or(global_mean);
            MeanRatingRow {
                user_id: r.user_id,
                movie_id: r.movie_id,
                rating: r.rating,
                global_mean_rating: global_mean,
                user_mean_rating: user_mean,
                item_mean_rating: item_mean,
                user_item_mean_rating: (user_mean + item_mean) / 2.0,
            }
        })
        .collect())
}

/// Outcome of the weighted user/item mean grid search
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedMeanResult {
    pub predictions: Vec<f64>,
    pub best_w: f64,
    pub best_rmse: f64,
}

/// Searches `w` in steps of 0.1 for `w·user_mean + (1-w)·item_mean`
///
/// The first weight reaching the lowest RMSE wins.
pub fn best_weighted_mean(rows: &[MeanRatingRow]) -> Result<WeightedMeanResult, MetricsError> {
    let truth: Vec<f64> = rows.iter().map(|r| r.rating).collect();
    let predict = |w: f64| -> Vec<f64> {
        rows.iter()
            .map(|r| w * r.user_mean_rating + (1.0 - w) * r.item_mean_rating)
            .collect()
    };

    let mut best_w = 0.0;
    let mut best_rmse = f64::INFINITY;
    for step in 0..=10 {
        let w = step as f64 * 0.1;
        let error = rmse(&truth, &predict(w))?;
        if error < best_rmse {
            best_rmse = error;
            best_w = w;
        }
    }

    Ok(WeightedMeanResult {
        predictions: predict(best_w),
        best_w,
        best_rmse,
    })
}

/// Shuffles ratings with a seeded RNG and holds out `test_fraction` of them
pub fn train_test_split(
    ratings: &[Rating],
    test_fraction: f64,
    seed: u64,
) -> (Vec<Rating>, Vec<Rating>) {
    let mut shuffled = ratings.to_vec();
    let mut rng = StdRng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);

    let fraction = test_fraction.clamp(0.0, 1.0);
    let test_len = (ratings.len() as f64 * fraction).ceil() as usize;
    let train = shuffled.split_off(test_len.min(shuffled.len()));
    (train, shuffled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mse_and_rmse() {
        let truth = [3.0, 4.0, 5.0];
        let predicted = [2.0, 4.0, 7.0];
        assert!((mse(&truth, &predicted).unwrap() - 5.0 / 3.0).abs() < 1e-12);
        assert!((rmse(&truth, &predicted).unwrap() - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_metric_errors() {
        assert_eq!(
            mse(&[1.0], &[1.0, 2.0]),
            Err(MetricsError::LengthMismatch {
                truth: 1,
                predicted: 2
            })
        );
        assert_eq!(rmse(&[], &[]), Err(MetricsError::Empty));
    }

    #[test]
    fn test_user_item_mean_ratings() {
        let train = vec![
            Rating::new(1, 10, 4.0),
            Rating::new(1, 20, 2.0),
            Rating::new(2, 10, 5.0),
        ];
        let test = vec![Rating::new(1, 10, 4.5), Rating::new(3, 30, 3.0)];
        let rows = user_item_mean_ratings(&train, &test).unwrap();

        let global = 11.0 / 3.0;
        assert!((rows[0].global_mean_rating - global).abs() < 1e-12);
        assert_eq!(rows[0].user_mean_rating, 3.0);
        assert_eq!(rows[0].item_mean_rating, 4.5);
        assert_eq!(rows[0].user_item_mean_rating, 3.75);

        // unseen user and movie fall back to the global mean
        assert!((rows[1].user_mean_rating - global).abs() < 1e-12);
        assert!((rows[1].item_mean_rating - global).abs() < 1e-12);
    }

    #[test]
    fn test_user_item_mean_requires_training_data() {
        assert_eq!(
            user_item_mean_ratings(&[], &[Rating::new(1, 1, 1.0)]),
            Err(MetricsError::Empty)
        );
    }

    #[test]
    fn test_best_weighted_mean_prefers_user_mean() {
        let rows: Vec<MeanRatingRow> = [(4.0, 4.0, 1.0), (2.0, 2.0, 5.0)]
            .iter()
            .enumerate()
            .map(|(i, &(rating, user, item))| MeanRatingRow {
                user_id: i as UserId,
                movie_id: i as MovieId,
                rating,
                global_mean_rating: 3.0,
                user_mean_rating: user,
                item_mean_rating: item,
                user_item_mean_rating: (user + item) / 2.0,
            })
            .collect();

        let result = best_weighted_mean(&rows).unwrap();
        assert!((result.best_w - 1.0).abs() < 1e-9);
        assert!(result.best_rmse < 1e-9);
        assert_eq!(result.predictions.len(), 2);
    }

    #[test]
    fn test_train_test_split_is_deterministic() {
        let ratings: Vec<Rating> = (0..10).map(|i| Rating::new(i, i, 3.0)).collect();
        let (train_a, test_a) = train_test_split(&ratings, 0.2, 42);
        let (train_b, test_b) = train_test_split(&ratings, 0.2, 42);

        assert_eq!(test_a.len(), 2);
        assert_eq!(train_a.len(), 8);
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
    }
}
