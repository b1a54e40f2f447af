//! Embedder trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A provider that turns text into fixed-dimension vectors.
///
/// Implementations wrap a specific embedding backend (a hosted API, a local
/// model) behind one async interface. Instances are constructed by the
/// caller and injected into the [`RagPipeline`](crate::RagPipeline); the
/// pipeline treats them as stateless per call.
///
/// # Example
///
/// ```rust,ignore
/// use pgrag::Embedder;
///
/// let embedder = MyEmbedder::new();
/// let vectors = embedder.embed_batch(&["hello", "world"]).await?;
/// assert_eq!(vectors[0].len(), embedder.dimensions());
/// ```
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts.
    ///
    /// Must return exactly one vector per input, in input order, each of
    /// length [`dimensions`](Embedder::dimensions).
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text. Equivalent to `embed_batch(&[text])[0]`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text]).await?.into_iter().next().ok_or_else(|| {
            RagError::Embedding {
                provider: self.name().to_string(),
                message: "provider returned no embedding".to_string(),
            }
        })
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// A short provider name used in errors and logs.
    fn name(&self) -> &str {
        "embedder"
    }
}
