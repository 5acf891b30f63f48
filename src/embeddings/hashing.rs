//! Feature-hashed bag-of-words embeddings.
//!
//! No model download, no inference runtime: each whitespace token is hashed
//! into one of `dimensions` buckets with a hash-derived sign, and the
//! resulting vector is L2-normalized. Texts sharing vocabulary land close
//! under cosine distance, which is all the demo pipeline and the test suite
//! need from a backend.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::embeddings::Embedder;
use crate::types::RagError;

pub const DEFAULT_DIMENSIONS: usize = 256;

/// Deterministic hashing-based [`Embedder`].
#[derive(Clone, Debug)]
pub struct HashingEmbedder {
    dimensions: usize,
    name: String,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            name: format!("hashing-{dimensions}"),
            dimensions,
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let digest = hasher.finish();
            let bucket = (digest as usize) % self.dimensions;
            let sign = if digest & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        } else {
            // Tokenless text maps to a fixed unit vector so cosine distance
            // stays defined.
            vector[0] = 1.0;
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}
