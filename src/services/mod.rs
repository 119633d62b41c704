pub mod metadata;
pub mod recommendations;
pub mod semantic;

pub use metadata::{MetadataProvider, OmdbProvider};
pub use semantic::{EmbeddingProvider, OpenAiEmbedder, QdrantStore, SemanticSearch, VectorStore};
