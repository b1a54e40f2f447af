//! In-memory vector store using exact cosine distance.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency vector store
//! backed by a `BTreeMap` protected by a `tokio::sync::RwLock`. It implements
//! the same ranking, filtering, lifecycle and batch semantics as the pgvector
//! backend with an exhaustive scan instead of an ANN index. It is suitable
//! for development, testing, and small-scale use cases.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::document::{DocumentChunk, SearchResult};
use crate::error::{RagError, Result};
use crate::metadata::{Metadata, MetadataFilter};
use crate::vectorstore::{
    HnswParams, StoreLifecycle, StoreState, VectorStore, validate_batch, validate_chunk,
    validate_embedding,
};

#[derive(Debug)]
struct Rows {
    next_id: i64,
    chunks: BTreeMap<i64, DocumentChunk>,
    index: HnswParams,
}

impl Rows {
    fn insert(
        &mut self,
        collection_id: Uuid,
        content: &str,
        embedding: &[f32],
        metadata: Option<&Metadata>,
    ) -> DocumentChunk {
        let chunk = DocumentChunk {
            id: self.next_id,
            collection_id,
            content: content.to_string(),
            embedding: embedding.to_vec(),
            metadata: metadata.cloned(),
            created_at: Utc::now(),
        };
        self.next_id += 1;
        self.chunks.insert(chunk.id, chunk.clone());
        chunk
    }
}

/// An in-memory [`VectorStore`] ranking by exact cosine distance.
///
/// Ids start at 1 and increase with every insert, like a `BIGSERIAL`
/// column. Batch inserts are validated up front and applied under a single
/// write lock, so readers never observe a partial batch.
///
/// # Example
///
/// ```rust,ignore
/// use pgrag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new(384);
/// store.initialize().await?;
/// ```
#[derive(Debug)]
pub struct InMemoryVectorStore {
    dimensions: usize,
    lifecycle: StoreLifecycle,
    rows: RwLock<Rows>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store for vectors of `dimensions` components.
    pub fn new(dimensions: usize) -> Self {
        Self::with_index(dimensions, HnswParams::default())
    }

    /// Create a store recording the given index parameters.
    ///
    /// Search is always exhaustive; the parameters are kept so that callers
    /// can swap backends without changing configuration.
    pub fn with_index(dimensions: usize, index: HnswParams) -> Self {
        Self {
            dimensions,
            lifecycle: StoreLifecycle::new(),
            rows: RwLock::new(Rows { next_id: 1, chunks: BTreeMap::new(), index }),
        }
    }

    /// The index parameters currently in effect.
    pub async fn index_params(&self) -> HnswParams {
        self.rows.read().await.index
    }

    /// Number of stored chunks.
    pub async fn len(&self) -> usize {
        self.rows.read().await.chunks.len()
    }

    /// Whether the store holds no chunks.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.chunks.is_empty()
    }

    async fn search(
        &self,
        collection_id: Option<Uuid>,
        embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        self.lifecycle.ensure_operational("similarity_search")?;
        validate_embedding(embedding, self.dimensions)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = self.rows.read().await;
        let mut scored: Vec<SearchResult> = rows
            .chunks
            .values()
            .filter(|chunk| collection_id.is_none_or(|c| chunk.collection_id == c))
            .filter(|chunk| filter.is_none_or(|f| f.matches(chunk.metadata.as_ref())))
            .map(|chunk| SearchResult {
                distance: cosine_distance(&chunk.embedding, embedding),
                chunk: chunk.clone(),
            })
            .collect();

        scored.sort_by(|a, b| {
            a.distance.total_cmp(&b.distance).then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        scored.truncate(k);
        debug!(backend = "InMemory", results = scored.len(), k, "similarity search");
        Ok(scored)
    }
}

/// Cosine distance `1 - cos(a, b)`, in `[0, 2]`.
///
/// Stores reject zero vectors before they get here; if one does arrive it is
/// treated as orthogonal to everything.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    let similarity = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);
    (1.0 - similarity).max(0.0)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn state(&self) -> StoreState {
        self.lifecycle.state()
    }

    async fn initialize(&self) -> Result<()> {
        self.lifecycle.ensure_open("initialize")?;
        if self.dimensions == 0 {
            return Err(RagError::Validation("vector dimension must be positive".to_string()));
        }
        self.rows.read().await.index.validate()?;
        if self.lifecycle.state() == StoreState::Uninitialized {
            self.lifecycle.advance(StoreState::Initialized, "initialize")?;
        }
        self.lifecycle.advance(StoreState::Operational, "initialize")?;
        debug!(backend = "InMemory", dimensions = self.dimensions, "store initialized");
        Ok(())
    }

    async fn store_chunk(
        &self,
        collection_id: Uuid,
        content: &str,
        embedding: &[f32],
        metadata: Option<&Metadata>,
    ) -> Result<DocumentChunk> {
        self.lifecycle.ensure_operational("store_chunk")?;
        validate_chunk(content, embedding, self.dimensions)?;

        let chunk = self.rows.write().await.insert(collection_id, content, embedding, metadata);
        debug!(backend = "InMemory", %collection_id, id = chunk.id, "stored chunk");
        Ok(chunk)
    }

    async fn store_chunks_batch(
        &self,
        collection_id: Uuid,
        contents: &[String],
        embeddings: &[Vec<f32>],
        metadatas: &[Option<Metadata>],
    ) -> Result<Vec<DocumentChunk>> {
        self.lifecycle.ensure_operational("store_chunks_batch")?;
        validate_batch(contents, embeddings, metadatas, self.dimensions)?;
        if contents.is_empty() {
            return Ok(Vec::new());
        }

        let mut rows = self.rows.write().await;
        let stored: Vec<DocumentChunk> = contents
            .iter()
            .zip(embeddings)
            .zip(metadatas)
            .map(|((content, embedding), metadata)| {
                rows.insert(collection_id, content, embedding, metadata.as_ref())
            })
            .collect();

        debug!(backend = "InMemory", %collection_id, count = stored.len(), "stored chunk batch");
        Ok(stored)
    }

    async fn similarity_search(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        self.search(None, embedding, k, filter).await
    }

    async fn collection_search(
        &self,
        collection_id: Uuid,
        embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        self.search(Some(collection_id), embedding, k, filter).await
    }

    async fn collection_chunks(&self, collection_id: Uuid) -> Result<Vec<DocumentChunk>> {
        self.lifecycle.ensure_operational("collection_chunks")?;
        let rows = self.rows.read().await;
        Ok(rows.chunks.values().filter(|c| c.collection_id == collection_id).cloned().collect())
    }

    async fn delete_chunk_by_id(&self, id: i64) -> Result<bool> {
        self.lifecycle.ensure_operational("delete_chunk_by_id")?;
        let removed = self.rows.write().await.chunks.remove(&id).is_some();
        debug!(backend = "InMemory", id, removed, "deleted chunk");
        Ok(removed)
    }

    async fn delete_collection(&self, collection_id: Uuid) -> Result<u64> {
        self.lifecycle.ensure_operational("delete_collection")?;
        let mut rows = self.rows.write().await;
        let before = rows.chunks.len();
        rows.chunks.retain(|_, chunk| chunk.collection_id != collection_id);
        let deleted = (before - rows.chunks.len()) as u64;
        debug!(backend = "InMemory", %collection_id, deleted, "deleted collection");
        Ok(deleted)
    }

    async fn delete_by_metadata_filter(&self, filter: &MetadataFilter) -> Result<u64> {
        self.lifecycle.ensure_operational("delete_by_metadata_filter")?;
        if filter.is_empty() {
            warn!(backend = "InMemory", "empty metadata filter: deleting every chunk");
        }
        let mut rows = self.rows.write().await;
        let before = rows.chunks.len();
        rows.chunks.retain(|_, chunk| !filter.matches(chunk.metadata.as_ref()));
        let deleted = (before - rows.chunks.len()) as u64;
        debug!(backend = "InMemory", deleted, "deleted chunks by metadata filter");
        Ok(deleted)
    }

    async fn rebuild_index(&self, params: HnswParams) -> Result<()> {
        self.lifecycle.ensure_operational("rebuild_index")?;
        params.validate()?;
        self.rows.write().await.index = params;
        debug!(
            backend = "InMemory",
            m = params.m,
            ef_construction = params.ef_construction,
            "index rebuilt"
        );
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        self.lifecycle.ensure_open("health_check")?;
        Ok(true)
    }

    async fn close(&self) -> Result<()> {
        if self.lifecycle.close() {
            debug!(backend = "InMemory", "store closed");
        }
        Ok(())
    }
}
