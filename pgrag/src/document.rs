//! Data types for stored chunks and search results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metadata::Metadata;

/// A stored retrieval unit.
///
/// Chunks are never mutated once persisted; they are only inserted or
/// deleted. Editing a document means deleting its collection and ingesting
/// it again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    /// Store-assigned, monotonically increasing identifier.
    pub id: i64,
    /// Groups every chunk derived from one source document.
    pub collection_id: Uuid,
    /// The chunk text.
    pub content: String,
    /// The vector embedding of `content`.
    pub embedding: Vec<f32>,
    /// Optional metadata, shared by all chunks of one ingestion call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Insertion timestamp.
    pub created_at: DateTime<Utc>,
}

/// A retrieved [`DocumentChunk`] paired with its distance to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: DocumentChunk,
    /// Cosine distance to the query vector (0 = same direction).
    pub distance: f32,
}
