//! Sentence-transformer embeddings via [`fastembed`].
//!
//! Compiled in with the `minilm` feature. First use downloads the ONNX model
//! into fastembed's local cache.

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use parking_lot::Mutex;
use tracing::info;

use crate::embeddings::Embedder;
use crate::types::RagError;

pub const MODEL_NAME: &str = "all-MiniLM-L6-v2";
pub const DIMENSIONS: usize = 384;

/// MiniLM-L6-v2 [`Embedder`].
///
/// The ONNX session is not re-entrant, so calls serialize through a mutex.
/// Inference runs on the calling thread; batches are small enough here that
/// blocking the runtime briefly is acceptable.
pub struct MiniLmEmbedder {
    model: Mutex<TextEmbedding>,
}

impl MiniLmEmbedder {
    pub fn new() -> Result<Self, RagError> {
        info!(model = MODEL_NAME, "loading embedding model");
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false),
        )
        .map_err(|err| RagError::Embedding(err.to_string()))?;
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

#[async_trait]
impl Embedder for MiniLmEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self
            .model
            .lock()
            .embed(texts.to_vec(), None)
            .map_err(|err| RagError::Embedding(err.to_string()))?;
        if vectors.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "model returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }
}
