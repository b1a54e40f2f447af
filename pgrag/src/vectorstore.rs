//! Vector store trait, lifecycle tracking and shared input validation.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{DocumentChunk, SearchResult};
use crate::error::{RagError, Result};
use crate::metadata::{Metadata, MetadataFilter};

/// A storage backend for chunk embeddings with similarity search.
///
/// A store owns one table of [`DocumentChunk`]s with a fixed embedding
/// dimension. Ranking is by cosine distance, ascending, with ties broken by
/// ascending chunk id. Every write is either a single row or one
/// all-or-nothing batch; chunks are never updated in place.
///
/// Stores move through [`StoreState`]: call
/// [`initialize`](VectorStore::initialize) before reading or writing, and
/// [`close`](VectorStore::close) when done. Any call after `close` fails with
/// [`RagError::StoreClosed`].
///
/// # Example
///
/// ```rust,ignore
/// use pgrag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new(384);
/// store.initialize().await?;
/// let chunk = store.store_chunk(collection_id, "text", &embedding, None).await?;
/// let results = store.similarity_search(&query_embedding, 5, None).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// The embedding dimension every stored vector must have.
    fn dimensions(&self) -> usize;

    /// The current lifecycle state.
    fn state(&self) -> StoreState;

    /// Ensure the schema and similarity index exist, then verify them.
    ///
    /// Safe to call repeatedly.
    async fn initialize(&self) -> Result<()>;

    /// Persist one chunk and return it with its assigned id and timestamp.
    async fn store_chunk(
        &self,
        collection_id: Uuid,
        content: &str,
        embedding: &[f32],
        metadata: Option<&Metadata>,
    ) -> Result<DocumentChunk>;

    /// Persist a batch of chunks atomically: either all become visible or none do.
    ///
    /// The three slices must have equal lengths; otherwise
    /// [`RagError::Validation`] is returned before any write.
    async fn store_chunks_batch(
        &self,
        collection_id: Uuid,
        contents: &[String],
        embeddings: &[Vec<f32>],
        metadatas: &[Option<Metadata>],
    ) -> Result<Vec<DocumentChunk>>;

    /// Return up to `k` chunks closest to `embedding` whose metadata contains `filter`.
    async fn similarity_search(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>>;

    /// Like [`similarity_search`](VectorStore::similarity_search), restricted to one collection.
    async fn collection_search(
        &self,
        collection_id: Uuid,
        embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>>;

    /// All chunks of a collection in id order.
    async fn collection_chunks(&self, collection_id: Uuid) -> Result<Vec<DocumentChunk>>;

    /// Delete one chunk. Returns `false` if no chunk had that id.
    async fn delete_chunk_by_id(&self, id: i64) -> Result<bool>;

    /// Delete every chunk of a collection and return how many were removed.
    async fn delete_collection(&self, collection_id: Uuid) -> Result<u64>;

    /// Delete every chunk whose metadata contains `filter`.
    ///
    /// **An empty filter deletes every chunk in the store.** This is
    /// intentional; pass [`MetadataFilter::match_all`] to opt in.
    async fn delete_by_metadata_filter(&self, filter: &MetadataFilter) -> Result<u64>;

    /// Drop the similarity index and build it again with new parameters.
    async fn rebuild_index(&self, params: HnswParams) -> Result<()>;

    /// Lightweight connectivity check. Does not change any state.
    async fn health_check(&self) -> Result<bool>;

    /// Release the store's resources. Idempotent.
    async fn close(&self) -> Result<()>;
}

/// Lifecycle of a [`VectorStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreState {
    /// Connected, schema not yet ensured.
    Uninitialized,
    /// Schema and index ensured but not yet verified.
    Initialized,
    /// Accepting reads and writes.
    Operational,
    /// Closed; every further call fails.
    Closed,
}

impl StoreState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => StoreState::Uninitialized,
            1 => StoreState::Initialized,
            2 => StoreState::Operational,
            _ => StoreState::Closed,
        }
    }
}

impl fmt::Display for StoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreState::Uninitialized => "uninitialized",
            StoreState::Initialized => "initialized",
            StoreState::Operational => "operational",
            StoreState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Thread-safe [`StoreState`] holder shared by the store backends.
#[derive(Debug)]
pub struct StoreLifecycle {
    state: AtomicU8,
}

impl Default for StoreLifecycle {
    fn default() -> Self {
        Self { state: AtomicU8::new(StoreState::Uninitialized as u8) }
    }
}

impl StoreLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> StoreState {
        StoreState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Fail with [`RagError::StoreClosed`] once the store is closed.
    pub fn ensure_open(&self, operation: &'static str) -> Result<()> {
        match self.state() {
            StoreState::Closed => Err(RagError::StoreClosed { operation }),
            _ => Ok(()),
        }
    }

    /// Fail unless the store is [`StoreState::Operational`].
    pub fn ensure_operational(&self, operation: &'static str) -> Result<()> {
        match self.state() {
            StoreState::Operational => Ok(()),
            StoreState::Closed => Err(RagError::StoreClosed { operation }),
            StoreState::Uninitialized | StoreState::Initialized => {
                Err(RagError::NotInitialized { operation })
            }
        }
    }

    /// Move forward to `next` unless the store has been closed meanwhile.
    pub fn advance(&self, next: StoreState, operation: &'static str) -> Result<()> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if StoreState::from_u8(current) == StoreState::Closed {
                return Err(RagError::StoreClosed { operation });
            }
            match self.state.compare_exchange(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    /// Mark the store closed. Returns `true` if it was open before.
    pub fn close(&self) -> bool {
        self.state.swap(StoreState::Closed as u8, Ordering::AcqRel) != StoreState::Closed as u8
    }
}

/// HNSW construction parameters.
///
/// `m` is the graph fan-out, `ef_construction` the candidate-list size while
/// building. Larger values raise recall and build cost. Changing either
/// requires [`VectorStore::rebuild_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswParams {
    pub m: u32,
    pub ef_construction: u32,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self { m: 16, ef_construction: 64 }
    }
}

impl HnswParams {
    /// Create validated parameters.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] if either value is zero.
    pub fn new(m: u32, ef_construction: u32) -> Result<Self> {
        let params = Self { m, ef_construction };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.m == 0 {
            return Err(RagError::Validation("HNSW m must be a positive integer".to_string()));
        }
        if self.ef_construction == 0 {
            return Err(RagError::Validation(
                "HNSW ef_construction must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

/// Check an embedding against the store dimension.
pub fn validate_embedding(embedding: &[f32], dimensions: usize) -> Result<()> {
    if embedding.len() != dimensions {
        return Err(RagError::Validation(format!(
            "embedding has {} dimensions, store expects {dimensions}",
            embedding.len()
        )));
    }
    if let Some(pos) = embedding.iter().position(|v| !v.is_finite()) {
        return Err(RagError::Validation(format!(
            "embedding component {pos} is not a finite number"
        )));
    }
    if embedding.iter().all(|v| *v == 0.0) {
        return Err(RagError::Validation(
            "embedding is a zero vector, which has no cosine distance".to_string(),
        ));
    }
    Ok(())
}

/// Check one chunk before it is written.
pub fn validate_chunk(content: &str, embedding: &[f32], dimensions: usize) -> Result<()> {
    if content.trim().is_empty() {
        return Err(RagError::Validation("chunk content must not be empty".to_string()));
    }
    validate_embedding(embedding, dimensions)
}

/// Check a whole batch before any of it is written.
pub fn validate_batch(
    contents: &[String],
    embeddings: &[Vec<f32>],
    metadatas: &[Option<Metadata>],
    dimensions: usize,
) -> Result<()> {
    if contents.len() != embeddings.len() || contents.len() != metadatas.len() {
        return Err(RagError::Validation(format!(
            "batch lists differ in length: {} contents, {} embeddings, {} metadata entries",
            contents.len(),
            embeddings.len(),
            metadatas.len()
        )));
    }
    for (index, (content, embedding)) in contents.iter().zip(embeddings).enumerate() {
        validate_chunk(content, embedding, dimensions)
            .map_err(|e| RagError::Validation(format!("batch item {index}: {e}")))?;
    }
    Ok(())
}
