//! Interactive Wikipedia retrieval demo.
//!
//! Builds the `wikipedia` collection from the first articles of the dataset,
//! then answers free-text queries with the nearest stored chunks until
//! Ctrl+C. All knobs are compiled-in defaults; there are no flags.

use std::sync::Arc;

use wikirag::dataset::{HfWikipediaSource, PageCache};
use wikirag::embeddings::{CachingEmbedder, Embedder};
use wikirag::ingestion::{IngestOptions, IngestOutcome, ingest};
use wikirag::repl::QueryLoop;
use wikirag::stores::sqlite::SqliteVectorStore;
use wikirag::types::RagError;

/// Dataset responses are cached here across runs.
const CACHE_DIR: &str = "wikirag_cache";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("[ERROR] {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), RagError> {
    let options = IngestOptions::default();
    eprintln!(
        "[INFO] Building the '{}' collection from {} Wikipedia articles...",
        options.collection_name, options.num_articles
    );

    let source = HfWikipediaSource::new()?.with_cache(PageCache::new(CACHE_DIR));
    let embedder = build_embedder()?;
    let store = SqliteVectorStore::open_in_memory().await?;

    let outcome = ingest(&source, embedder.as_ref(), &store, &options).await?;
    report(&outcome);

    eprintln!("[INFO] Ready for queries! Type your question and press Enter (Ctrl+C to exit).");
    QueryLoop::new(embedder, outcome.collection).run().await
}

#[cfg(feature = "minilm")]
fn build_embedder() -> Result<Arc<dyn Embedder>, RagError> {
    use wikirag::embeddings::minilm::MiniLmEmbedder;
    Ok(Arc::new(CachingEmbedder::new(MiniLmEmbedder::new()?)))
}

#[cfg(not(feature = "minilm"))]
fn build_embedder() -> Result<Arc<dyn Embedder>, RagError> {
    use wikirag::embeddings::HashingEmbedder;
    Ok(Arc::new(CachingEmbedder::new(HashingEmbedder::default())))
}

fn report(outcome: &IngestOutcome) {
    for summary in &outcome.summaries {
        match &summary.preview {
            Some(preview) => println!(
                "Article {} '{}' -> {} chunks: {}",
                summary.article_index, summary.title, summary.chunk_count, preview
            ),
            None => println!(
                "Article {} '{}' -> no chunks (empty text)",
                summary.article_index, summary.title
            ),
        }
    }
    let telemetry = &outcome.telemetry;
    eprintln!(
        "[INFO] Stored {} chunks from {} articles ({}-dimensional {}, {} ms).",
        telemetry.total_chunks,
        telemetry.articles,
        telemetry.dimensions,
        telemetry.embedder,
        telemetry.duration_ms
    );
}

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter("info")
            .with_writer(std::io::stderr)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
