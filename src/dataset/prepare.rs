use std::collections::HashMap;

use crate::models::{Movie, MovieId, RawCredits, RawKeywords, RawMovieMetadata};

use super::literal::{parse_list_cell, Literal};

/// Number of cast members, keywords and genres kept per movie
const TOP_NAMES: usize = 3;

/// Appends the `key` field of every dict in every list cell to `target`
///
/// Cells that are missing, unparsable or not lists contribute nothing.
pub fn extend_names_from_column<'a, I>(cells: I, key: &str, target: &mut Vec<String>)
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    for cell in cells {
        let Ok(items) = parse_list_cell(cell) else {
            continue;
        };
        target.extend(
            items
                .iter()
                .filter_map(|item| item.get(key).and_then(Literal::as_str))
                .map(str::to_string),
        );
    }
}

/// Counts how often each name appears across list cells, most frequent first
pub fn name_frequencies<'a, I>(cells: I, key: &str) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut names = Vec::new();
    extend_names_from_column(cells, key, &mut names);

    let mut counts: HashMap<String, usize> = HashMap::new();
    for name in names {
        *counts.entry(name).or_default() += 1;
    }

    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Name of the first crew member whose job is `Director`
pub fn director(crew: &[Literal]) -> Option<String> {
    crew.iter()
        .find(|member| member.get("job").and_then(Literal::as_str) == Some("Director"))
        .and_then(|member| member.get("name").and_then(Literal::as_str))
        .map(str::to_string)
}

/// Names of the first three entries of a list of dicts
pub fn top_names(items: &[Literal]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.get("name").and_then(Literal::as_str))
        .take(TOP_NAMES)
        .map(str::to_string)
        .collect()
}

/// Lowercases and strips spaces so multi-word names become single tokens
pub fn clean_text(text: &str) -> String {
    text.replace(' ', "").to_lowercase()
}

pub fn clean_all(texts: &[String]) -> Vec<String> {
    texts.iter().map(|t| clean_text(t)).collect()
}

/// Cleans an optional value; missing values become the empty string
pub fn clean_optional(text: Option<&str>) -> String {
    text.map(clean_text).unwrap_or_default()
}

/// Space-joined keywords, cast, director and genres of a movie
pub fn bag_of_words(
    keywords: &[String],
    cast: &[String],
    director: &str,
    genres: &[String],
) -> String {
    keywords
        .iter()
        .chain(cast)
        .map(String::as_str)
        .chain(std::iter::once(director))
        .chain(genres.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a raw id column; the metadata dump contains a few dates there
pub fn parse_movie_id(raw: &str) -> Option<MovieId> {
    raw.trim().parse().ok()
}

fn list_or_empty(cell: Option<&str>, column: &str, id: MovieId) -> Vec<Literal> {
    parse_list_cell(cell).unwrap_or_else(|e| {
        tracing::warn!(movie_id = id, column, error = %e, "Unparsable list cell");
        Vec::new()
    })
}

/// Joins metadata, credits and keywords on movie id and builds prepared movies
///
/// Only movies present in all three tables are kept, in metadata order; the
/// first row wins when an id repeats.
pub fn prepare_movies(
    metadata: &[RawMovieMetadata],
    credits: &[RawCredits],
    keywords: &[RawKeywords],
) -> Vec<Movie> {
    let mut credits_by_id: HashMap<MovieId, &RawCredits> = HashMap::new();
    for row in credits {
        if let Some(id) = parse_movie_id(&row.id) {
            credits_by_id.entry(id).or_insert(row);
        }
    }

    let mut keywords_by_id: HashMap<MovieId, &RawKeywords> = HashMap::new();
    for row in keywords {
        if let Some(id) = parse_movie_id(&row.id) {
            keywords_by_id.entry(id).or_insert(row);
        }
    }

    let mut seen = std::collections::HashSet::new();
    let mut movies = Vec::new();
    let mut skipped = 0usize;

    for row in metadata {
        let Some(id) = parse_movie_id(&row.id) else {
            skipped += 1;
            continue;
        };
        if !seen.insert(id) {
            continue;
        }
        let (Some(credit), Some(keyword)) = (credits_by_id.get(&id), keywords_by_id.get(&id))
        else {
            continue;
        };

        let crew = list_or_empty(credit.crew.as_deref(), "crew", id);
        let cast = list_or_empty(credit.cast.as_deref(), "cast", id);
        let words = list_or_empty(keyword.keywords.as_deref(), "keywords", id);
        let genres = list_or_empty(row.genres.as_deref(), "genres", id);

        let director_name = clean_optional(director(&crew).as_deref());
        let bag = bag_of_words(
            &clean_all(&top_names(&words)),
            &clean_all(&top_names(&cast)),
            &director_name,
            &clean_all(&top_names(&genres)),
        );

        movies.push(Movie {
            id,
            title: row.title.clone().unwrap_or_default(),
            imdb_id: row.imdb_id.clone().filter(|s| !s.is_empty()),
            bag_of_words: bag,
        });
    }

    if skipped > 0 {
        tracing::warn!(skipped, "Skipped metadata rows with malformed ids");
    }
    tracing::info!(movies = movies.len(), "Prepared movies");

    movies
}
