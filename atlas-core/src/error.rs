use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Geocoding error: {0}")]
    Geocode(#[from] crate::geocode::GeocodeError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] crate::embeddings::EmbeddingError),

    #[error("Other error: {0}")]
    Other(String),
}
