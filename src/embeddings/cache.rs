//! In-memory embedding cache.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::embeddings::Embedder;
use crate::types::RagError;

/// Wraps an [`Embedder`] and memoizes vectors by exact text.
///
/// Within one batch, repeated texts are embedded once; across batches, any
/// text seen before is served from the cache. The interactive loop re-embeds
/// queries, so repeat questions cost nothing after the first ask.
pub struct CachingEmbedder<E> {
    inner: E,
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, Vec<f32>>,
    hits: u64,
    misses: u64,
}

/// Hit and miss counters, one count per requested text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl<E: Embedder> CachingEmbedder<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
        }
    }
}

#[async_trait]
impl<E: Embedder> Embedder for CachingEmbedder<E> {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Collect the texts the cache cannot answer, deduplicated, without
        // holding the lock across the inner embed call.
        let pending: Vec<String> = {
            let mut state = self.state.lock();
            let mut pending = Vec::new();
            for text in texts {
                if state.entries.contains_key(text) {
                    state.hits += 1;
                } else {
                    state.misses += 1;
                    if !pending.contains(text) {
                        pending.push(text.clone());
                    }
                }
            }
            pending
        };

        if !pending.is_empty() {
            let vectors = self.inner.embed_batch(&pending).await?;
            if vectors.len() != pending.len() {
                return Err(RagError::Embedding(format!(
                    "backend returned {} vectors for {} texts",
                    vectors.len(),
                    pending.len()
                )));
            }
            let mut state = self.state.lock();
            for (text, vector) in pending.into_iter().zip(vectors) {
                state.entries.insert(text, vector);
            }
        }

        let state = self.state.lock();
        texts
            .iter()
            .map(|text| {
                state.entries.get(text).cloned().ok_or_else(|| {
                    RagError::Embedding(format!("cache lost entry for text {text:?}"))
                })
            })
            .collect()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;

    fn strings(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn matches_the_inner_backend() {
        let plain = HashingEmbedder::default();
        let cached = CachingEmbedder::new(HashingEmbedder::default());
        let texts = strings(&["alpha", "beta", "alpha"]);

        let expected = plain.embed_batch(&texts).await.unwrap();
        let actual = cached.embed_batch(&texts).await.unwrap();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn counts_hits_and_misses_per_text() {
        let cached = CachingEmbedder::new(HashingEmbedder::default());

        cached
            .embed_batch(&strings(&["a", "b", "a"]))
            .await
            .unwrap();
        // "a" twice in one batch: both lookups miss before the backend runs.
        assert_eq!(cached.stats(), CacheStats { hits: 0, misses: 3 });

        cached.embed_batch(&strings(&["a", "c"])).await.unwrap();
        assert_eq!(cached.stats(), CacheStats { hits: 1, misses: 4 });
    }

    #[tokio::test]
    async fn delegates_metadata() {
        let cached = CachingEmbedder::new(HashingEmbedder::new(32));
        assert_eq!(cached.dimensions(), 32);
        assert_eq!(cached.model_name(), "hashing-32");
    }
}
