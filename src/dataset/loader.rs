use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{Movie, RawCredits, RawKeywords, RawMovieMetadata, Rating, WeightedScore};

fn open(path: &Path) -> AppResult<File> {
    File::open(path).map_err(|e| {
        AppError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })
}

/// Reads every row of a CSV with headers, failing on the first bad row
pub fn read_rows<T, R>(reader: R) -> AppResult<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut reader = csv::Reader::from_reader(reader);
    let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
    Ok(rows)
}

/// Reads a CSV with headers, skipping rows that do not deserialize
///
/// The raw Kaggle dumps contain a few broken rows; they are counted and
/// logged instead of aborting the whole load.
pub fn read_rows_lenient<T, R>(reader: R) -> AppResult<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for result in reader.deserialize() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                tracing::debug!(error = %e, "Skipping malformed row");
            }
        }
    }

    if skipped > 0 {
        tracing::warn!(skipped, kept = rows.len(), "Skipped malformed CSV rows");
    }

    Ok(rows)
}

/// Writes rows as CSV with a header line
pub fn write_rows<T, W>(writer: W, rows: &[T]) -> AppResult<()>
where
    T: Serialize,
    W: Write,
{
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_ratings(path: &Path) -> AppResult<Vec<Rating>> {
    let ratings: Vec<Rating> = read_rows(open(path)?)?;
    tracing::info!(path = %path.display(), count = ratings.len(), "Loaded ratings");
    Ok(ratings)
}

pub fn load_movies(path: &Path) -> AppResult<Vec<Movie>> {
    let movies: Vec<Movie> = read_rows(open(path)?)?;
    tracing::info!(path = %path.display(), count = movies.len(), "Loaded movies");
    Ok(movies)
}

pub fn load_weighted_scores(path: &Path) -> AppResult<Vec<WeightedScore>> {
    let scores: Vec<WeightedScore> = read_rows(open(path)?)?;
    tracing::info!(path = %path.display(), count = scores.len(), "Loaded weighted scores");
    Ok(scores)
}

pub fn load_raw_metadata(path: &Path) -> AppResult<Vec<RawMovieMetadata>> {
    read_rows_lenient(open(path)?)
}

pub fn load_raw_credits(path: &Path) -> AppResult<Vec<RawCredits>> {
    read_rows_lenient(open(path)?)
}

pub fn load_raw_keywords(path: &Path) -> AppResult<Vec<RawKeywords>> {
    read_rows_lenient(open(path)?)
}

/// Writes rows to a file, creating parent directories as needed
pub fn save_rows<T: Serialize>(path: &Path, rows: &[T]) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_rows(File::create(path)?, rows)?;
    tracing::info!(path = %path.display(), count = rows.len(), "Wrote CSV");
    Ok(())
}
