//! Interactive query loop.
//!
//! Reads one query per line, embeds it, searches the collection, and prints
//! the ranked chunks. Ctrl+C (or end of input) ends the session with a
//! goodbye; recoverable per-query failures are logged to stderr and the
//! loop re-prompts.

use std::io::Write as _;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::debug;

use crate::embeddings::Embedder;
use crate::stores::QueryHit;
use crate::stores::sqlite::Collection;
use crate::types::RagError;

/// Results returned per query.
pub const DEFAULT_TOP_K: usize = 5;

const SEPARATOR: &str = "----------------------------------------";

/// The read-embed-search-print loop over one collection.
pub struct QueryLoop {
    embedder: Arc<dyn Embedder>,
    collection: Collection,
    top_k: usize,
}

impl QueryLoop {
    pub fn new(embedder: Arc<dyn Embedder>, collection: Collection) -> Self {
        Self {
            embedder,
            collection,
            top_k: DEFAULT_TOP_K,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Runs the loop over stdin until Ctrl+C or end of input.
    pub async fn run(&self) -> Result<(), RagError> {
        self.run_from(BufReader::new(tokio::io::stdin())).await
    }

    /// Runs the loop over any line source. Tests drive this with in-memory
    /// readers.
    ///
    /// Embedding, query, and dimension errors are printed with an `[ERROR]`
    /// prefix and the loop continues; anything else is unexpected here and
    /// propagates.
    pub async fn run_from<R>(&self, reader: R) -> Result<(), RagError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        loop {
            print!("\nYour query: ");
            std::io::stdout().flush()?;

            // The wait for input is the only point where an interrupt is
            // acted on.
            let line = tokio::select! {
                interrupt = signal::ctrl_c() => {
                    interrupt?;
                    goodbye();
                    break;
                }
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                goodbye();
                break;
            };
            let query = line.trim();
            if query.is_empty() {
                continue;
            }

            match self.answer(query).await {
                Ok(rendered) => println!("{rendered}"),
                Err(
                    err @ (RagError::Embedding(_)
                    | RagError::Query(_)
                    | RagError::DimensionMismatch { .. }),
                ) => eprintln!("[ERROR] {err}"),
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Embeds `query` and renders its nearest chunks.
    pub async fn answer(&self, query: &str) -> Result<String, RagError> {
        debug!(query, top_k = self.top_k, "running query");
        let mut vectors = self.embedder.embed_batch(&[query.to_string()]).await?;
        let embedding = vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("no vector returned for the query".into()))?;
        let hits = self.collection.query(&embedding, self.top_k).await?;
        Ok(render_hits(&hits))
    }
}

fn goodbye() {
    println!("\nExiting. Goodbye!");
}

/// Formats hits as ranked blocks: header, then per hit a `[rank]` line with
/// the article metadata and distance to 4 decimal places, the chunk text,
/// and a separator line.
pub fn render_hits(hits: &[QueryHit]) -> String {
    let mut out = format!("\nTop {} chunks:", hits.len());
    for (rank, hit) in hits.iter().enumerate() {
        out.push_str(&format!(
            "\n[{}] article_index: {}, title: {}, distance: {:.4}\n{}\n{}",
            rank + 1,
            hit.article_index,
            hit.title,
            hit.distance,
            hit.text,
            SEPARATOR
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use crate::stores::ChunkRecord;
    use crate::stores::sqlite::SqliteVectorStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Embedder that counts batches so tests can see which lines became
    /// queries.
    struct CountingEmbedder {
        inner: HashingEmbedder,
        calls: Mutex<usize>,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                inner: HashingEmbedder::new(16),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            *self.calls.lock() += 1;
            self.inner.embed_batch(texts).await
        }

        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    fn hit(article_index: usize, title: &str, text: &str, distance: f32) -> QueryHit {
        QueryHit {
            id: format!("chunk{article_index}"),
            article_index,
            title: title.to_string(),
            text: text.to_string(),
            distance,
        }
    }

    #[test]
    fn renders_rank_metadata_and_distance() {
        let rendered = render_hits(&[
            hit(0, "Alpha", "first chunk text", 0.125),
            hit(3, "Beta", "second chunk text", 0.5),
        ]);

        assert!(rendered.starts_with("\nTop 2 chunks:"));
        assert!(rendered.contains("[1] article_index: 0, title: Alpha, distance: 0.1250"));
        assert!(rendered.contains("[2] article_index: 3, title: Beta, distance: 0.5000"));
        assert!(rendered.contains("\nfirst chunk text\n"));
        assert_eq!(rendered.matches(SEPARATOR).count(), 2);
    }

    async fn loop_over_empty_collection(embedder: Arc<CountingEmbedder>) -> QueryLoop {
        let store = SqliteVectorStore::open_in_memory().await.unwrap();
        let collection = store.create_collection("repl_empty", 16).await.unwrap();
        QueryLoop::new(embedder, collection)
    }

    #[tokio::test]
    async fn end_of_input_stops_cleanly() {
        let embedder = Arc::new(CountingEmbedder::new());
        let query_loop = loop_over_empty_collection(embedder.clone()).await;

        query_loop.run_from(&b""[..]).await.unwrap();
        assert_eq!(*embedder.calls.lock(), 0);
    }

    #[tokio::test]
    async fn blank_lines_do_not_become_queries() {
        let embedder = Arc::new(CountingEmbedder::new());
        let query_loop = loop_over_empty_collection(embedder.clone()).await;

        query_loop.run_from(&b"\n   \n\t\n"[..]).await.unwrap();
        assert_eq!(*embedder.calls.lock(), 0);
    }

    #[tokio::test]
    async fn query_errors_do_not_stop_the_loop() {
        let embedder = Arc::new(CountingEmbedder::new());
        // Empty collection: every query fails with a recoverable error.
        let query_loop = loop_over_empty_collection(embedder.clone()).await;

        query_loop.run_from(&b"hello\nworld\n"[..]).await.unwrap();
        assert_eq!(*embedder.calls.lock(), 2);
    }

    #[tokio::test]
    async fn answer_renders_stored_chunks() {
        let embedder = Arc::new(HashingEmbedder::new(16));
        let store = SqliteVectorStore::open_in_memory().await.unwrap();
        let collection = store.create_collection("repl_data", 16).await.unwrap();

        let vectors = embedder
            .embed_batch(&["stars shine at night".to_string()])
            .await
            .unwrap();
        collection
            .add(vec![ChunkRecord::new(
                "chunk0",
                0,
                "Stars",
                "stars shine at night",
                vectors[0].clone(),
            )])
            .await
            .unwrap();

        let query_loop = QueryLoop::new(embedder, collection).with_top_k(1);
        let rendered = query_loop.answer("stars shine at night").await.unwrap();
        assert!(rendered.contains("Top 1 chunks:"));
        assert!(rendered.contains("title: Stars, distance: 0.0000"));
        assert!(rendered.contains("stars shine at night"));
    }
}
