use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;

use super::{MovieId, OmdbMovie};

/// Qdrant point identifier, either an unsigned integer or a UUID string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(String),
}

impl PointId {
    /// Movie id behind the point, when the point was indexed by movie id
    pub fn as_movie_id(&self) -> Option<MovieId> {
        match self {
            PointId::Num(id) => Some(*id),
            PointId::Uuid(s) => s.parse().ok(),
        }
    }
}

impl Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointId::Num(id) => write!(f, "{}", id),
            PointId::Uuid(id) => write!(f, "{}", id),
        }
    }
}

/// A point to upload into the vector store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorPoint {
    pub id: PointId,
    pub vector: Vec<f32>,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

/// A search result from the vector store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredPoint {
    pub id: PointId,
    pub score: f32,
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
}

/// A semantic search hit resolved against the movie table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub movie_id: Option<MovieId>,
    pub title: Option<String>,
    pub imdb_id: Option<String>,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<OmdbMovie>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_untagged_serde() {
        let num: PointId = serde_json::from_str("862").unwrap();
        assert_eq!(num, PointId::Num(862));

        let uuid: PointId =
            serde_json::from_str(r#""5c56c793-69f3-4fbf-87e6-c4bf54c28c26""#).unwrap();
        assert!(matches!(uuid, PointId::Uuid(_)));
        assert_eq!(uuid.as_movie_id(), None);
    }

    #[test]
    fn test_scored_point_without_payload() {
        let point: ScoredPoint =
            serde_json::from_str(r#"{"id": 5, "version": 3, "score": 0.87}"#).unwrap();
        assert_eq!(point.id.as_movie_id(), Some(5));
        assert!(point.payload.is_none());
    }
}
