pub mod completions;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod error;
pub mod geocode;
pub mod models;

pub use completions::{CompletionBackend, CompletionConfig, CompletionError, OpenAiChatClient};
pub use config::AtlasConfig;
pub use embeddings::{
    create_backend, BackendConfig, EmbeddingBackend, EmbeddingConfig, EmbeddingError,
    OpenAiEmbeddingClient, OptionalEmbeddingClient, OPENAI_DIMENSIONS,
};
pub use error::AtlasError;
pub use geocode::{GeocodeError, Geocoder, NominatimClient};
pub use models::{CategoryCount, KnowledgeChunk, KnowledgeItem};
