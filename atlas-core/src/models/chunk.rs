use chrono::{DateTime, Utc};
use pgvector::Vector;
use serde::{Deserialize, Serialize};

/// One retrieval chunk derived from a knowledge item.
///
/// Chunk ids are `"{item_id}-{n}"`; the embedding stays NULL until the
/// backend has produced a vector for the chunk.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct KnowledgeChunk {
    pub id: String,
    pub item_id: i64,
    pub content: String,
    pub embedding: Option<Vector>,
    pub model_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
