use crate::models::{MovieId, RawMovieMetadata, WeightedScore};

use super::prepare::parse_movie_id;

/// Default vote-count quantile a movie must reach to be scored
pub const DEFAULT_QUANTILE: f64 = 0.90;

/// Quantile with linear interpolation between the closest ranks
///
/// Returns `None` for empty input or a quantile outside `0.0..=1.0`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// IMDB weighted rating `v/(v+m)·R + m/(v+m)·C`
pub fn weighted_rating(vote_count: f64, vote_average: f64, min_votes: f64, mean_vote: f64) -> f64 {
    let total = vote_count + min_votes;
    if total <= 0.0 {
        return mean_vote;
    }
    vote_count / total * vote_average + min_votes / total * mean_vote
}

/// Scores every movie whose vote count reaches the `q` quantile
///
/// Rows without an integer id or without votes are ignored. Output is sorted
/// by score, best first.
pub fn weighted_scores(metadata: &[RawMovieMetadata], q: f64) -> Vec<WeightedScore> {
    let voted: Vec<(MovieId, f64, f64)> = metadata
        .iter()
        .filter_map(|row| {
            let id = parse_movie_id(&row.id)?;
            Some((id, row.vote_count?, row.vote_average?))
        })
        .collect();

    if voted.is_empty() {
        return Vec::new();
    }

    let mean_vote = voted.iter().map(|(_, _, avg)| avg).sum::<f64>() / voted.len() as f64;
    let counts: Vec<f64> = voted.iter().map(|(_, count, _)| *count).collect();
    let Some(min_votes) = quantile(&counts, q) else {
        return Vec::new();
    };

    tracing::info!(mean_vote, min_votes, quantile = q, "Computed weighted rating parameters");

    let mut seen = std::collections::HashSet::new();
    let mut scores: Vec<WeightedScore> = voted
        .into_iter()
        .filter(|(id, count, _)| *count >= min_votes && seen.insert(*id))
        .map(|(id, count, avg)| WeightedScore {
            id,
            score: weighted_rating(count, avg, min_votes, mean_vote),
        })
        .collect();

    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    scores
}
