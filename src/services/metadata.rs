//! Movie metadata lookups
//!
//! The recommender only knows ids, titles and bags of words; posters, plots
//! and cast lists come from OMDb by IMDB id.

use reqwest::Client as HttpClient;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{OmdbMovie, OmdbResponse},
};

const MOVIE_CACHE_TTL: u64 = 604800; // 1 week

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetches metadata for an IMDB id such as `tt0114709`
    async fn movie_metadata(&self, imdb_id: &str) -> AppResult<OmdbMovie>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

#[derive(Clone)]
pub struct OmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Option<Cache>,
}

impl OmdbProvider {
    pub fn new(cache: Option<Cache>, api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        }
    }

    async fn fetch_movie(&self, imdb_id: &str) -> AppResult<OmdbMovie> {
        let url = format!("{}/", self.api_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str()), ("i", imdb_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "OMDb API returned status {}: {}",
                status, body
            )));
        }

        let raw: OmdbResponse = response.json().await?;
        if !raw.is_found() {
            return Err(AppError::NotFound(format!(
                "Movie with {} returned with {}",
                imdb_id,
                raw.error.as_deref().unwrap_or("no error message")
            )));
        }

        tracing::info!(imdb_id = %imdb_id, provider = "omdb", "Fetched movie metadata");
        Ok(raw.into_movie(imdb_id))
    }
}

#[async_trait::async_trait]
impl MetadataProvider for OmdbProvider {
    async fn movie_metadata(&self, imdb_id: &str) -> AppResult<OmdbMovie> {
        let imdb_id = imdb_id.trim();
        if imdb_id.is_empty() {
            return Err(AppError::InvalidInput("IMDB id cannot be empty".to_string()));
        }

        match &self.cache {
            Some(cache) => cached!(
                cache,
                CacheKey::Movie(imdb_id.to_string()),
                MOVIE_CACHE_TTL,
                self.fetch_movie(imdb_id)
            ),
            None => self.fetch_movie(imdb_id).await,
        }
    }

    fn name(&self) -> &'static str {
        "omdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn provider(server: &MockServer) -> OmdbProvider {
        OmdbProvider::new(None, "test-key".to_string(), server.base_url())
    }

    #[tokio::test]
    async fn test_movie_metadata_found() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/")
                .query_param("apikey", "test-key")
                .query_param("i", "tt0114709");
            then.status(200).json_body(json!({
                "Title": "Toy Story",
                "Year": "1995",
                "Genre": "Animation, Adventure",
                "Director": "John Lasseter",
                "imdbRating": "8.3",
                "imdbID": "tt0114709",
                "Response": "True"
            }));
        });

        let movie = provider(&server).movie_metadata("tt0114709").await.unwrap();

        mock.assert();
        assert_eq!(movie.title, "Toy Story");
        assert_eq!(movie.director.as_deref(), Some("John Lasseter"));
        assert_eq!(movie.genres, vec!["Animation", "Adventure"]);
    }

    #[tokio::test]
    async fn test_movie_metadata_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/").query_param("i", "tt0000000");
            then.status(200)
                .json_body(json!({"Response": "False", "Error": "Incorrect IMDb ID."}));
        });

        let err = provider(&server)
            .movie_metadata("tt0000000")
            .await
            .unwrap_err();

        match err {
            AppError::NotFound(msg) => {
                assert_eq!(msg, "Movie with tt0000000 returned with Incorrect IMDb ID.")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_movie_metadata_upstream_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(401).body("Invalid API key!");
        });

        let err = provider(&server)
            .movie_metadata("tt0114709")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ExternalApi(_)));
    }

    #[tokio::test]
    async fn test_empty_id_rejected_without_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET);
            then.status(200);
        });

        let err = provider(&server).movie_metadata("  ").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        mock.assert_hits(0);
    }
}
