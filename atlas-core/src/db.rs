use crate::config::DatabaseConfig;
use crate::error::AtlasError;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, AtlasError> {
    Ok(PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?)
}

pub async fn health_check(pool: &PgPool) -> Result<String, AtlasError> {
    let row: (String,) = sqlx::query_as("SELECT version()").fetch_one(pool).await?;
    Ok(row.0)
}

pub async fn check_pgvector(pool: &PgPool) -> Result<String, AtlasError> {
    let row: (String,) =
        sqlx::query_as("SELECT extversion FROM pg_extension WHERE extname = 'vector'")
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}

/// Create the tables the service needs if they do not exist yet.
///
/// `knowledge_chunks.embedding` dimensionality must match the configured
/// embedding backend; the default is 1536 (text-embedding-3-small).
pub async fn init_schema(pool: &PgPool, dimensions: u32) -> Result<(), AtlasError> {
    sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS knowledge_items (
            id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            category TEXT NOT NULL,
            location TEXT,
            latitude DOUBLE PRECISION,
            longitude DOUBLE PRECISION,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS knowledge_chunks (
            id TEXT PRIMARY KEY,
            item_id BIGINT NOT NULL REFERENCES knowledge_items(id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            embedding vector({dimensions}),
            model_name TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS knowledge_items_category_idx ON knowledge_items (category)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
