//! Text embedding backends.
//!
//! Everything downstream of the chunker speaks [`Embedder`]: one batched
//! call in, one vector per input text out, in the same order. The default
//! backend is the dependency-free [`HashingEmbedder`]; the `minilm` feature
//! adds [`minilm::MiniLmEmbedder`], a real sentence-transformer, behind the
//! same trait. [`CachingEmbedder`] wraps either and skips repeat texts.

use async_trait::async_trait;

use crate::types::RagError;

pub mod cache;
pub mod hashing;
#[cfg(feature = "minilm")]
pub mod minilm;

pub use cache::{CacheStats, CachingEmbedder};
pub use hashing::HashingEmbedder;

/// A batched text-to-vector encoder.
///
/// Implementations must return exactly one vector per input text, in input
/// order, each of [`dimensions`](Embedder::dimensions) length.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Length of every vector this backend produces.
    fn dimensions(&self) -> usize;

    /// Stable name for logs and telemetry.
    fn model_name(&self) -> &str;
}
