//! Error types for the `pgrag` crate.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid input rejected before any I/O took place: embedding dimension
    /// mismatch, mismatched batch lengths, invalid index parameters, invalid
    /// window/overlap sizes.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backing store could not be reached.
    #[error("Connection error ({backend}): {message}")]
    Connection {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during answer generation.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An operation was issued after the store was closed.
    #[error("Vector store is closed (operation: {operation})")]
    StoreClosed {
        /// The rejected operation.
        operation: &'static str,
    },

    /// A data operation was issued before the store finished initializing.
    #[error("Vector store is not initialized (operation: {operation})")]
    NotInitialized {
        /// The rejected operation.
        operation: &'static str,
    },

    /// A query or statement failed inside the vector store backend.
    #[error("Vector store error ({backend}, {operation}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// The operation that failed.
        operation: &'static str,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A call exceeded the configured operation timeout.
    #[error("Operation timed out: {operation}")]
    Timeout {
        /// The operation that timed out.
        operation: &'static str,
    },

    /// Document ingestion stopped part-way through. Chunks persisted before
    /// the failure stay in the store under `collection_id`.
    #[error(
        "Ingestion aborted for collection {collection_id} after {persisted} chunk(s): {source}"
    )]
    IngestAborted {
        /// The collection the document was being written to.
        collection_id: Uuid,
        /// Number of chunks that were persisted before the failure.
        persisted: usize,
        /// The underlying failure.
        #[source]
        source: Box<RagError>,
    },
}

impl RagError {
    /// Whether the failure is transient and the caller may retry.
    ///
    /// Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            RagError::Connection { .. }
            | RagError::Timeout { .. }
            | RagError::Embedding { .. }
            | RagError::Generation { .. } => true,
            RagError::IngestAborted { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
