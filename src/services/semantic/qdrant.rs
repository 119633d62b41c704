use reqwest::{Client as HttpClient, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    models::{ScoredPoint, VectorPoint},
};

use super::VectorStore;

/// Qdrant wraps every payload in `{"result": ..., "status": ..., "time": ...}`
#[derive(Debug, Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CollectionsResult {
    collections: Vec<CollectionDescription>,
}

#[derive(Debug, Deserialize)]
struct CollectionDescription {
    name: String,
}

/// Qdrant REST client bound to one collection
#[derive(Clone)]
pub struct QdrantStore {
    http_client: HttpClient,
    url: String,
    api_key: Option<String>,
    collection: String,
}

impl QdrantStore {
    pub fn new(url: String, api_key: Option<String>, collection: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            url: url.trim_end_matches('/').to_string(),
            api_key,
            collection,
        }
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> AppResult<T> {
        let response = self.with_auth(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Qdrant returned status {}: {}",
                status, body
            )));
        }

        let parsed: QdrantResponse<T> = response.json().await?;
        Ok(parsed.result)
    }
}

#[async_trait::async_trait]
impl VectorStore for QdrantStore {
    async fn list_collections(&self) -> AppResult<Vec<String>> {
        let url = format!("{}/collections", self.url);
        let result: CollectionsResult = self.send(self.http_client.get(&url)).await?;
        Ok(result.collections.into_iter().map(|c| c.name).collect())
    }

    async fn ensure_collection(&self, dimension: usize) -> AppResult<bool> {
        if self.list_collections().await?.contains(&self.collection) {
            return Ok(false);
        }

        let url = format!("{}/collections/{}", self.url, self.collection);
        let body = json!({ "vectors": { "size": dimension, "distance": "Cosine" } });
        let _: bool = self.send(self.http_client.put(&url).json(&body)).await?;

        tracing::info!(collection = %self.collection, dimension, "Created Qdrant collection");
        Ok(true)
    }

    async fn upload_points(&self, points: &[VectorPoint]) -> AppResult<()> {
        if points.is_empty() {
            return Ok(());
        }
        let url = format!("{}/collections/{}/points", self.url, self.collection);
        let request = self
            .http_client
            .put(&url)
            .query(&[("wait", "true")])
            .json(&json!({ "points": points }));
        let _: serde_json::Value = self.send(request).await?;

        tracing::info!(collection = %self.collection, points = points.len(), "Uploaded points");
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> AppResult<Vec<ScoredPoint>> {
        let url = format!("{}/collections/{}/points/search", self.url, self.collection);
        let body = json!({ "vector": vector, "limit": limit, "with_payload": true });
        self.send(self.http_client.post(&url).json(&body)).await
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
