//! Article corpus access.
//!
//! The pipeline only ever asks a corpus one question: "give me the first
//! `count` articles". [`ArticleSource`] captures that contract;
//! [`hf::HfWikipediaSource`] answers it from the Hugging Face datasets API
//! and [`StaticArticleSource`] from a fixed in-memory list, which keeps the
//! rest of the pipeline testable without a network.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::RagError;

pub mod cache;
pub mod hf;

pub use cache::PageCache;
pub use hf::HfWikipediaSource;

/// One raw article as supplied by a corpus.
///
/// `index` is the 0-based position within the fetched batch; chunk metadata
/// denormalizes it together with `title`, so both must be stable for the
/// lifetime of a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Article {
    pub index: usize,
    pub title: String,
    pub text: String,
}

/// A corpus that can supply a prefix of its articles in a stable order.
///
/// Implementations must be deterministic for a fixed corpus and `count`:
/// calling `fetch(n)` twice yields the same articles in the same order,
/// indexed `0..n`. A corpus holding fewer than `count` articles fails with
/// [`RagError::SourceExhausted`]; an unreachable corpus with
/// [`RagError::SourceUnavailable`].
#[async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch(&self, count: usize) -> Result<Vec<Article>, RagError>;
}

/// Serves articles from a fixed in-memory list.
#[derive(Clone, Debug, Default)]
pub struct StaticArticleSource {
    articles: Vec<Article>,
}

impl StaticArticleSource {
    #[must_use]
    pub fn new(articles: Vec<Article>) -> Self {
        Self { articles }
    }

    /// Builds a source from `(title, text)` pairs, indexed in order.
    pub fn from_pairs<T>(pairs: impl IntoIterator<Item = (T, T)>) -> Self
    where
        T: Into<String>,
    {
        let articles = pairs
            .into_iter()
            .enumerate()
            .map(|(index, (title, text))| Article {
                index,
                title: title.into(),
                text: text.into(),
            })
            .collect();
        Self { articles }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

#[async_trait]
impl ArticleSource for StaticArticleSource {
    async fn fetch(&self, count: usize) -> Result<Vec<Article>, RagError> {
        if count > self.articles.len() {
            return Err(RagError::SourceExhausted {
                requested: count,
                available: self.articles.len(),
            });
        }
        Ok(self
            .articles
            .iter()
            .take(count)
            .enumerate()
            .map(|(index, article)| Article {
                index,
                title: article.title.clone(),
                text: article.text.clone(),
            })
            .collect())
    }
}
