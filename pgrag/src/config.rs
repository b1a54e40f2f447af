//! Configuration for the RAG pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// System instruction sent ahead of every question.
pub const DEFAULT_SYSTEM_MESSAGE: &str =
    "Answer based on the context. If unsure, say you don't know. Cite sources when possible.";

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Documents up to this many characters are stored as a single chunk.
    pub max_chunk_length: usize,
    /// Words per chunk for the default word-window chunker.
    pub chunk_size: usize,
    /// Words shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved when a query does not say otherwise.
    pub top_k: usize,
    /// Embed and store chunks in groups of this size. `None` embeds and
    /// stores each chunk on its own.
    pub batch_size: Option<usize>,
    /// Maximum number of embedding groups in flight at once.
    pub embed_concurrency: usize,
    /// System instruction placed before the context and question.
    pub system_message: String,
    /// Deadline applied to each embedder, generator and store call.
    pub operation_timeout: Option<Duration>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            max_chunk_length: 1500,
            chunk_size: 1000,
            chunk_overlap: 100,
            top_k: 3,
            batch_size: None,
            embed_concurrency: 1,
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            operation_timeout: None,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `max_chunk_length`, `top_k` or `embed_concurrency` is zero
    /// - `batch_size` is `Some(0)`
    /// - `operation_timeout` is zero
    pub fn validate(&self) -> Result<()> {
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.max_chunk_length == 0 {
            return Err(RagError::Config("max_chunk_length must be greater than zero".to_string()));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if self.batch_size == Some(0) {
            return Err(RagError::Config("batch_size must be greater than zero".to_string()));
        }
        if self.embed_concurrency == 0 {
            return Err(RagError::Config("embed_concurrency must be greater than zero".to_string()));
        }
        if self.operation_timeout.is_some_and(|t| t.is_zero()) {
            return Err(RagError::Config("operation_timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the single-chunk threshold in characters.
    pub fn max_chunk_length(mut self, length: usize) -> Self {
        self.config.max_chunk_length = length;
        self
    }

    /// Set the number of words per chunk.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in words.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the default number of chunks to retrieve.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Embed and store chunks in groups of `size`.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = Some(size);
        self
    }

    /// Set how many embedding groups may be in flight at once.
    pub fn embed_concurrency(mut self, concurrency: usize) -> Self {
        self.config.embed_concurrency = concurrency;
        self
    }

    /// Replace the system instruction.
    pub fn system_message(mut self, message: impl Into<String>) -> Self {
        self.config.system_message = message.into();
        self
    }

    /// Apply a deadline to every collaborator and store call.
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.config.operation_timeout = Some(timeout);
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
