use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw response from the OMDb `?i=` lookup
///
/// OMDb answers HTTP 200 for misses too; `Response` is `"False"` and `Error`
/// carries the reason.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OmdbResponse {
    pub response: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub rated: Option<String>,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub actors: Option<String>,
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default, rename = "imdbRating")]
    pub imdb_rating: Option<String>,
    #[serde(default, rename = "imdbID")]
    pub imdb_id: Option<String>,
}

impl OmdbResponse {
    /// Whether OMDb found the title
    pub fn is_found(&self) -> bool {
        self.response.eq_ignore_ascii_case("true")
    }

    /// Converts a successful lookup into our model
    pub fn into_movie(self, requested_id: &str) -> OmdbMovie {
        OmdbMovie {
            imdb_id: self.imdb_id.unwrap_or_else(|| requested_id.to_string()),
            title: self.title.unwrap_or_default(),
            year: not_available(self.year),
            rated: not_available(self.rated),
            released: not_available(self.released),
            runtime: not_available(self.runtime),
            genres: split_list(self.genre),
            director: not_available(self.director),
            actors: split_list(self.actors),
            plot: not_available(self.plot),
            poster: not_available(self.poster),
            imdb_rating: not_available(self.imdb_rating).and_then(|r| r.parse().ok()),
            fetched_at: Utc::now(),
        }
    }
}

/// Movie metadata returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OmdbMovie {
    pub imdb_id: String,
    pub title: String,
    pub year: Option<String>,
    pub rated: Option<String>,
    pub released: Option<String>,
    pub runtime: Option<String>,
    pub genres: Vec<String>,
    pub director: Option<String>,
    pub actors: Vec<String>,
    pub plot: Option<String>,
    pub poster: Option<String>,
    pub imdb_rating: Option<f64>,
    pub fetched_at: DateTime<Utc>,
}

/// OMDb spells missing values as "N/A"
fn not_available(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty() && v != "N/A")
}

fn split_list(value: Option<String>) -> Vec<String> {
    not_available(value)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
