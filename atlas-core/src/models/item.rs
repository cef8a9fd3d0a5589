use serde::{Deserialize, Serialize};

/// One knowledge-base entry.
///
/// `id` is absent until a row has been persisted. `location`, `latitude` and
/// `longitude` are independently optional on the wire; absent fields are
/// omitted from JSON rather than serialized as null, so a round trip
/// preserves absence exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct KnowledgeItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl KnowledgeItem {
    /// Both coordinates, or nothing. A half-present pair is representable on
    /// the wire but never acted upon.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// The text fed into chunking and embedding for retrieval.
    pub fn document_text(&self) -> String {
        format!(
            "Title: {}\nContent: {}\nCategory: {}",
            self.title, self.content, self.category
        )
    }
}
