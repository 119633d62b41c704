use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::Utc;

use filmora::{
    error::{AppError, AppResult},
    ml::{MlRecommender, SvdModel, SvdParams},
    models::{Movie, OmdbMovie, PointId, Rating, ScoredPoint, VectorPoint, WeightedScore},
    routes::{create_router, AppState},
    services::{EmbeddingProvider, MetadataProvider, SemanticSearch, VectorStore},
};

fn movie(id: u64, title: &str, bag: &str) -> Movie {
    Movie {
        id,
        title: title.to_string(),
        imdb_id: Some(format!("tt{:07}", id)),
        bag_of_words: bag.to_string(),
    }
}

fn recommender() -> Arc<MlRecommender> {
    let ratings = vec![
        Rating::new(1, 862, 5.0),
        Rating::new(1, 949, 3.0),
        Rating::new(1, 863, 4.5),
        Rating::new(2, 862, 4.0),
        Rating::new(2, 8844, 2.5),
    ];
    let movies = vec![
        movie(862, "Toy Story", "toy tomhanks timallen johnlasseter animation"),
        movie(8844, "Jumanji", "boardgame robinwilliams joejohnston adventure"),
        movie(949, "Heat", "robbery alpacino michaelmann crime"),
        movie(863, "Toy Story 2", "toy tomhanks timallen johnlasseter animation sequel"),
        movie(10681, "WALL-E", "robot andrewstanton animation"),
    ];
    let weighted = vec![
        WeightedScore { id: 862, score: 7.6 },
        WeightedScore { id: 863, score: 7.1 },
        WeightedScore { id: 10681, score: 7.5 },
    ];
    let params = SvdParams {
        n_factors: 4,
        n_epochs: 30,
        ..SvdParams::default()
    };
    let model = SvdModel::train(&ratings, params).unwrap();
    Arc::new(MlRecommender::new(model, ratings, movies, weighted))
}

fn create_test_server(state: AppState) -> TestServer {
    TestServer::new(create_router(Arc::new(state))).unwrap()
}

fn default_server() -> TestServer {
    create_test_server(AppState::new(recommender()))
}

struct StubMetadata;

#[async_trait::async_trait]
impl MetadataProvider for StubMetadata {
    async fn movie_metadata(&self, imdb_id: &str) -> AppResult<OmdbMovie> {
        if imdb_id != "tt0000862" {
            return Err(AppError::NotFound(format!(
                "Movie with {} returned with Incorrect IMDb ID.",
                imdb_id
            )));
        }
        Ok(OmdbMovie {
            imdb_id: imdb_id.to_string(),
            title: "Toy Story".to_string(),
            year: Some("1995".to_string()),
            rated: Some("G".to_string()),
            released: None,
            runtime: Some("81 min".to_string()),
            genres: vec!["Animation".to_string()],
            director: Some("John Lasseter".to_string()),
            actors: vec!["Tom Hanks".to_string()],
            plot: None,
            poster: None,
            imdb_rating: Some(8.3),
            fetched_at: Utc::now(),
        })
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

struct StubEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, inputs: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(inputs.iter().map(|_| vec![1.0, 0.0]).collect())
    }

    fn model(&self) -> &str {
        "stub-model"
    }
}

struct StubStore;

#[async_trait::async_trait]
impl VectorStore for StubStore {
    async fn list_collections(&self) -> AppResult<Vec<String>> {
        Ok(vec!["movies_metadata".to_string()])
    }

    async fn ensure_collection(&self, _dimension: usize) -> AppResult<bool> {
        Ok(false)
    }

    async fn upload_points(&self, _points: &[VectorPoint]) -> AppResult<()> {
        Ok(())
    }

    async fn search(&self, _vector: &[f32], limit: usize) -> AppResult<Vec<ScoredPoint>> {
        let points = vec![
            ScoredPoint {
                id: PointId::Num(862),
                score: 0.92,
                payload: None,
            },
            ScoredPoint {
                id: PointId::Num(10681),
                score: 0.81,
                payload: None,
            },
        ];
        Ok(points.into_iter().take(limit).collect())
    }

    fn collection(&self) -> &str {
        "movies_metadata"
    }
}

#[tokio::test]
async fn test_health_check() {
    let server = default_server();

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "I am alive!");

    server.get("/").await.assert_status_ok();
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let server = default_server();

    let response = server
        .get("/health")
        .add_header(
            axum::http::HeaderName::from_static("x-request-id"),
            axum::http::HeaderValue::from_static("client-req-1"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "client-req-1");

    let response = server.get("/health").await;
    let generated = response.header("x-request-id");
    assert!(uuid::Uuid::parse_str(generated.to_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_recommendations_for_user() {
    let server = default_server();

    let response = server
        .get("/api/v1/users/1/recommendations")
        .add_query_param("limit", 3)
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["user_id"], 1);
    let recommendations = body["recommendations"].as_array().unwrap();
    assert!(!recommendations.is_empty());
    assert!(recommendations.len() <= 3);

    let scores: Vec<f64> = recommendations
        .iter()
        .map(|r| r["score"].as_f64().unwrap())
        .collect();
    assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[tokio::test]
async fn test_recommendations_unknown_user() {
    let server = default_server();

    let response = server.get("/api/v1/users/999/recommendations").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn test_recommendations_limit_out_of_range() {
    let server = default_server();

    server
        .get("/api/v1/users/1/recommendations")
        .add_query_param("limit", 0)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .get("/api/v1/users/1/recommendations")
        .add_query_param("limit", 101)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_predicted_rating() {
    let server = default_server();

    let response = server.get("/api/v1/users/1/movies/863/rating").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let collaborative = body["collaborative"].as_f64().unwrap();
    let content = body["content_based"].as_f64().unwrap();
    let rating = body["rating"].as_f64().unwrap();
    assert_eq!(body["weighted"].as_f64().unwrap(), 7.1);
    assert!((rating - (0.5 * collaborative + 0.2 * content + 0.3 * 7.1)).abs() < 1e-9);
}

#[tokio::test]
async fn test_predicted_rating_unknown_movie() {
    let server = default_server();

    server
        .get("/api/v1/users/1/movies/424242/rating")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_similar_movies() {
    let server = default_server();

    let response = server
        .get("/api/v1/movies/862/similar")
        .add_query_param("limit", 2)
        .await;
    response.assert_status_ok();

    let similar: Vec<serde_json::Value> = response.json();
    assert_eq!(similar.len(), 2);
    assert_eq!(similar[0]["movie_id"], 863);
    assert_eq!(similar[0]["title"], "Toy Story 2");
    assert!(similar.iter().all(|m| m["movie_id"] != 862));
}

#[tokio::test]
async fn test_similar_movies_unknown_movie() {
    let server = default_server();

    server
        .get("/api/v1/movies/1/similar")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_path_parameter() {
    let server = default_server();

    server
        .get("/api/v1/users/not-a-number/recommendations")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_parameters_use_json_error_body() {
    let server = default_server();

    let response = server.get("/api/v1/users/not-a-number/recommendations").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["error"].is_string());

    let response = server
        .get("/api/v1/movies/862/similar")
        .add_query_param("limit", "lots")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_metadata_unavailable_without_provider() {
    let server = default_server();

    let response = server.get("/api/v1/movies/metadata/tt0000862").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metadata_lookup() {
    let mut state = AppState::new(recommender());
    state.metadata = Some(Arc::new(StubMetadata));
    let server = create_test_server(state);

    let response = server.get("/api/v1/movies/metadata/tt0000862").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["title"], "Toy Story");
    assert_eq!(body["director"], "John Lasseter");

    server
        .get("/api/v1/movies/metadata/tt9999999")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_unavailable_without_backends() {
    let server = default_server();

    server
        .get("/api/v1/search")
        .add_query_param("q", "toys")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_semantic_search() {
    let rec = recommender();
    let search = SemanticSearch::new(Arc::new(StubEmbedder), Arc::new(StubStore), rec.movies())
        .with_metadata(Arc::new(StubMetadata));
    let mut state = AppState::new(rec);
    state.search = Some(Arc::new(search));
    let server = create_test_server(state);

    let response = server
        .get("/api/v1/search")
        .add_query_param("q", "toys come alive")
        .add_query_param("limit", 2)
        .await;
    response.assert_status_ok();

    let hits: Vec<serde_json::Value> = response.json();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0]["title"], "Toy Story");
    assert_eq!(hits[0]["metadata"]["year"], "1995");
    // WALL-E's id is unknown to the stub provider, so it stays unenriched
    assert_eq!(hits[1]["title"], "WALL-E");
    assert!(hits[1].get("metadata").is_none());

    server
        .get("/api/v1/search")
        .add_query_param("q", "  ")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
