//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the full ingest-and-query workflow by
//! composing an [`Embedder`], a [`VectorStore`], a [`Chunker`] and a
//! [`Generator`].
//!
//! # Example
//!
//! ```rust,ignore
//! use pgrag::{InMemoryVectorStore, QueryOptions, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedder(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new(1536)))
//!     .generator(Arc::new(my_generator))
//!     .build()?;
//!
//! pipeline.initialize().await?;
//! pipeline.add_document(&text, Some(metadata), None).await?;
//! let answer = pipeline.query("What is 2FA?", &QueryOptions::new().top_k(1)).await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::chunking::{Chunker, WordWindowChunker};
use crate::config::RagConfig;
use crate::document::{DocumentChunk, SearchResult};
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::generation::{Generator, Message};
use crate::metadata::{Metadata, MetadataFilter};
use crate::vectorstore::VectorStore;

/// A document to ingest with [`RagPipeline::add_documents`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDocument {
    pub text: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    /// Reuse an existing collection id instead of generating one.
    #[serde(default)]
    pub collection_id: Option<Uuid>,
}

impl NewDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_collection_id(mut self, collection_id: Uuid) -> Self {
        self.collection_id = Some(collection_id);
        self
    }
}

/// The result of ingesting one document.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    /// The collection every chunk was stored under.
    pub collection_id: Uuid,
    /// The persisted chunks, in document order.
    pub chunks: Vec<DocumentChunk>,
}

/// Per-query retrieval options.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Number of chunks to retrieve; the pipeline's `top_k` when unset.
    pub k: Option<usize>,
    /// Metadata containment filter.
    pub filter: Option<MetadataFilter>,
    /// Restrict retrieval to one collection.
    pub collection_id: Option<Uuid>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    pub fn filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn collection(mut self, collection_id: Uuid) -> Self {
        self.collection_id = Some(collection_id);
        self
    }
}

/// Everything that went into and came out of one query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryTrace {
    pub question: String,
    pub system_message: String,
    /// The exact messages sent to the generator.
    pub messages: Vec<Message>,
    /// Retrieved chunks in rank order.
    pub retrieved: Vec<SearchResult>,
    pub answer: String,
}

/// Join retrieved chunk contents in rank order, separated by a blank line.
pub fn assemble_context(results: &[SearchResult]) -> String {
    results.iter().map(|r| r.chunk.content.as_str()).collect::<Vec<_>>().join("\n\n")
}

/// Build the two-message prompt: system instruction, then context and question.
pub fn build_messages(system_message: &str, context: &str, question: &str) -> Vec<Message> {
    vec![
        Message::system(system_message),
        Message::user(format!("Context:\n{context}\n\nQuestion: {question}")),
    ]
}

/// The RAG pipeline orchestrator.
///
/// Coordinates document ingestion (chunk → embed → store) and query
/// execution (embed → search → prompt → generate). Construct one via
/// [`RagPipeline::builder()`].
///
/// Nothing here retries. When `operation_timeout` is configured every
/// collaborator and store call is bounded by it; dropping a returned future
/// cancels the call in flight.
pub struct RagPipeline {
    config: RagConfig,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    generator: Arc<dyn Generator>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedder.
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Ensure the store's schema and index exist.
    pub async fn initialize(&self) -> Result<()> {
        self.bounded("initialize", self.vector_store.initialize()).await
    }

    /// Close the underlying store.
    pub async fn close(&self) -> Result<()> {
        self.vector_store.close().await
    }

    async fn bounded<T, F>(&self, operation: &'static str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.config.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, future).await.map_err(|_| {
                warn!(operation, ?limit, "operation timed out");
                RagError::Timeout { operation }
            })?,
            None => future.await,
        }
    }

    fn split(&self, text: &str) -> Vec<String> {
        if text.chars().count() <= self.config.max_chunk_length {
            vec![text.to_string()]
        } else {
            self.chunker.chunk(text)
        }
    }

    /// Ingest one document: chunk → embed → store.
    ///
    /// A fresh collection id is generated unless `collection_id` is given.
    /// Text no longer than `max_chunk_length` characters is stored verbatim
    /// as one chunk; longer text goes through the chunker. Every chunk gets
    /// the same `metadata`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] for blank text. Any embedding or
    /// storage failure stops the remaining chunks and is returned as
    /// [`RagError::IngestAborted`]; chunks stored before the failure are
    /// **not** rolled back and are reported in `persisted`.
    pub async fn add_document(
        &self,
        text: &str,
        metadata: Option<Metadata>,
        collection_id: Option<Uuid>,
    ) -> Result<IngestOutcome> {
        if text.trim().is_empty() {
            return Err(RagError::Validation("document text must not be empty".to_string()));
        }
        let collection_id = collection_id.unwrap_or_else(Uuid::new_v4);
        let chunks = self.split(text);
        debug!(
            %collection_id,
            chunk_count = chunks.len(),
            text_len = text.len(),
            "chunked document"
        );

        let mut stored = Vec::with_capacity(chunks.len());
        let written = match self.config.batch_size {
            None => self.ingest_each(collection_id, &chunks, metadata.as_ref(), &mut stored).await,
            Some(size) => {
                self.ingest_batched(collection_id, &chunks, metadata.as_ref(), size, &mut stored)
                    .await
            }
        };

        if let Err(e) = written {
            let persisted = stored.len();
            if persisted == 0 {
                error!(%collection_id, error = %e, "ingestion failed before any chunk was stored");
            } else {
                warn!(
                    %collection_id,
                    persisted,
                    remaining = chunks.len() - persisted,
                    error = %e,
                    "ingestion aborted; already stored chunks are kept"
                );
            }
            return Err(RagError::IngestAborted { collection_id, persisted, source: Box::new(e) });
        }

        info!(%collection_id, chunk_count = stored.len(), "ingested document");
        Ok(IngestOutcome { collection_id, chunks: stored })
    }

    async fn ingest_each(
        &self,
        collection_id: Uuid,
        chunks: &[String],
        metadata: Option<&Metadata>,
        stored: &mut Vec<DocumentChunk>,
    ) -> Result<()> {
        for content in chunks {
            let embedding = self.bounded("embed", self.embedder.embed(content)).await?;
            let chunk = self
                .bounded(
                    "store_chunk",
                    self.vector_store.store_chunk(collection_id, content, &embedding, metadata),
                )
                .await?;
            stored.push(chunk);
        }
        Ok(())
    }

    /// Embed groups of `batch_size` chunks with up to `embed_concurrency`
    /// requests in flight, then store each group atomically in original order.
    async fn ingest_batched(
        &self,
        collection_id: Uuid,
        chunks: &[String],
        metadata: Option<&Metadata>,
        batch_size: usize,
        stored: &mut Vec<DocumentChunk>,
    ) -> Result<()> {
        let mut embedded = stream::iter(chunks.chunks(batch_size))
            .map(|group| self.embed_group(group))
            .buffered(self.config.embed_concurrency);

        while let Some(result) = embedded.next().await {
            let (group, embeddings) = result?;
            let metadatas = vec![metadata.cloned(); group.len()];
            let written = self
                .bounded(
                    "store_chunks_batch",
                    self.vector_store.store_chunks_batch(
                        collection_id,
                        group,
                        &embeddings,
                        &metadatas,
                    ),
                )
                .await?;
            stored.extend(written);
        }
        Ok(())
    }

    async fn embed_group<'a>(&self, group: &'a [String]) -> Result<(&'a [String], Vec<Vec<f32>>)> {
        let texts: Vec<&str> = group.iter().map(String::as_str).collect();
        let embeddings = self.bounded("embed_batch", self.embedder.embed_batch(&texts)).await?;
        if embeddings.len() != group.len() {
            return Err(RagError::Embedding {
                provider: self.embedder.name().to_string(),
                message: format!(
                    "expected {} embeddings, provider returned {}",
                    group.len(),
                    embeddings.len()
                ),
            });
        }
        Ok((group, embeddings))
    }

    /// Ingest several documents in order, each under its own collection id.
    ///
    /// # Errors
    ///
    /// Stops at the first document that fails; documents before it stay stored.
    pub async fn add_documents(&self, documents: &[NewDocument]) -> Result<Vec<IngestOutcome>> {
        let mut outcomes = Vec::with_capacity(documents.len());
        for document in documents {
            let outcome = self
                .add_document(&document.text, document.metadata.clone(), document.collection_id)
                .await?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Delete every chunk of a previously ingested document.
    pub async fn delete_document(&self, collection_id: Uuid) -> Result<u64> {
        self.bounded("delete_collection", self.vector_store.delete_collection(collection_id)).await
    }

    /// Embed the question and return the ranked chunks, without generating an answer.
    pub async fn retrieve(
        &self,
        question: &str,
        options: &QueryOptions,
    ) -> Result<Vec<SearchResult>> {
        if question.trim().is_empty() {
            return Err(RagError::Validation("question must not be empty".to_string()));
        }
        let k = options.k.unwrap_or(self.config.top_k);
        let filter = options.filter.as_ref();

        let embedding = self.bounded("embed", self.embedder.embed(question)).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e
        })?;

        let results = match options.collection_id {
            Some(collection_id) => {
                self.bounded(
                    "collection_search",
                    self.vector_store.collection_search(collection_id, &embedding, k, filter),
                )
                .await
            }
            None => {
                self.bounded(
                    "similarity_search",
                    self.vector_store.similarity_search(&embedding, k, filter),
                )
                .await
            }
        }
        .map_err(|e| {
            error!(error = %e, k, "vector store search failed");
            e
        })?;

        debug!(result_count = results.len(), k, "retrieved chunks");
        Ok(results)
    }

    /// Answer a question from the stored chunks.
    pub async fn query(&self, question: &str, options: &QueryOptions) -> Result<String> {
        Ok(self.query_with_trace(question, options).await?.answer)
    }

    /// Answer a question and return the full trace: prompt, retrieved chunks and answer.
    ///
    /// # Errors
    ///
    /// Embedding, search and generation errors are returned as produced by
    /// the collaborator that failed.
    pub async fn query_with_trace(
        &self,
        question: &str,
        options: &QueryOptions,
    ) -> Result<QueryTrace> {
        let retrieved = self.retrieve(question, options).await?;
        let context = assemble_context(&retrieved);
        let messages = build_messages(&self.config.system_message, &context, question);

        let answer =
            self.bounded("generate", self.generator.generate(&messages)).await.map_err(|e| {
                error!(error = %e, "generation failed");
                e
            })?;

        info!(result_count = retrieved.len(), answer_len = answer.len(), "query completed");
        Ok(QueryTrace {
            question: question.to_string(),
            system_message: self.config.system_message.clone(),
            messages,
            retrieved,
            answer,
        })
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// The embedder, vector store and generator are required. Without a
/// config, [`RagConfig::default`] is used; without a chunker, a
/// [`WordWindowChunker`] built from the config's `chunk_size` and
/// `chunk_overlap`.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::builder().batch_size(32).build()?)
///     .embedder(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .generator(Arc::new(generator))
///     .chunker(Arc::new(SentenceChunker::new(200)?))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedder: Option<Arc<dyn Embedder>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    generator: Option<Arc<dyn Generator>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedder.
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the chunker used for documents above `max_chunk_length`.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing, the
    /// config is invalid, or the embedder and store disagree on dimension.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedder =
            self.embedder.ok_or_else(|| RagError::Config("embedder is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;
        let generator =
            self.generator.ok_or_else(|| RagError::Config("generator is required".to_string()))?;

        if embedder.dimensions() != vector_store.dimensions() {
            return Err(RagError::Config(format!(
                "embedder produces {}-dimensional vectors but the store expects {}",
                embedder.dimensions(),
                vector_store.dimensions()
            )));
        }

        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(WordWindowChunker::new(config.chunk_size, config.chunk_overlap)?),
        };

        Ok(RagPipeline { config, embedder, vector_store, chunker, generator })
    }
}
