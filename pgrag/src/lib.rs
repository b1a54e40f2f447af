//! # pgrag
//!
//! Retrieval-Augmented Generation over PostgreSQL with pgvector.
//!
//! Documents are split into chunks, embedded, and stored with optional JSON
//! metadata in a vector table indexed by HNSW under cosine distance. A
//! question is embedded, the closest chunks are retrieved and assembled into
//! a context, and a generator answers from that context. A
//! [`RagPipeline`](pipeline) orchestrates both workflows over pluggable
//! [`Embedder`], [`VectorStore`], [`Chunker`] and [`Generator`]
//! implementations.
//!
//! ## Features
//!
//! External backends are feature-gated. The default feature set includes
//! only core traits, the in-memory vector store, and chunking implementations.
//!
//! | Feature      | What it enables                                      |
//! |--------------|------------------------------------------------------|
//! | `openai`     | `OpenAIEmbedder` and `OpenAIGenerator` via reqwest   |
//! | `pgvector`   | `PgVectorStore` via sqlx                             |
//! | `full`       | All of the above                                     |

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod inmemory;
pub mod metadata;
pub mod pipeline;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "pgvector")]
pub mod pgvector;

pub use chunking::{Chunker, RecursiveChunker, SentenceChunker, WordWindowChunker, chunk_words};
pub use config::{DEFAULT_SYSTEM_MESSAGE, RagConfig, RagConfigBuilder};
pub use document::{DocumentChunk, SearchResult};
pub use embedding::Embedder;
pub use error::{RagError, Result};
pub use generation::{Generator, Message, Role};
pub use inmemory::InMemoryVectorStore;
pub use metadata::{Metadata, MetadataFilter};
pub use pipeline::{
    IngestOutcome, NewDocument, QueryOptions, QueryTrace, RagPipeline, RagPipelineBuilder,
};
pub use vectorstore::{HnswParams, StoreLifecycle, StoreState, VectorStore};

#[cfg(feature = "openai")]
pub use openai::{OpenAIEmbedder, OpenAIGenerator};
#[cfg(feature = "pgvector")]
pub use pgvector::{PgVectorConfig, PgVectorStore};
