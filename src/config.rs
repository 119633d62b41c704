use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Ratings table (userId, movieId, rating, timestamp)
    #[serde(default = "default_ratings_path")]
    pub ratings_path: String,

    /// Prepared movies table (id, title, imdb_id, bag_of_words)
    #[serde(default = "default_movies_path")]
    pub movies_path: String,

    /// Weighted scores table (id, score)
    #[serde(default = "default_weighted_path")]
    pub weighted_path: String,

    /// Persisted collaborative model
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Train and save the collaborative model at startup when the file is absent
    #[serde(default = "default_train_if_missing")]
    pub train_if_missing: bool,

    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// OMDb API key. Metadata lookups are disabled without it.
    #[serde(default)]
    pub omdb_api_key: Option<String>,

    /// OMDb API base URL
    #[serde(default = "default_omdb_api_url")]
    pub omdb_api_url: String,

    /// OpenAI API key used for text embeddings
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL
    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,

    /// Embedding model name
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Qdrant REST URL. Semantic search is disabled without it.
    #[serde(default)]
    pub qdrant_url: Option<String>,

    /// Qdrant API key
    #[serde(default)]
    pub qdrant_api_key: Option<String>,

    /// Qdrant collection holding movie vectors
    #[serde(default = "default_qdrant_collection")]
    pub qdrant_collection: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    80
}

fn default_ratings_path() -> String {
    "data/ratings_df.csv".to_string()
}

fn default_movies_path() -> String {
    "data/movies_df.csv".to_string()
}

fn default_weighted_path() -> String {
    "data/weighted_df.csv".to_string()
}

fn default_model_path() -> String {
    "models/svd_model.json".to_string()
}

fn default_train_if_missing() -> bool {
    true
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_omdb_api_url() -> String {
    "http://www.omdbapi.com".to_string()
}

fn default_openai_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_qdrant_collection() -> String {
    "movies_metadata".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_iter(std::env::vars())
    }

    /// Load configuration from an explicit set of variables
    pub fn from_iter<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
