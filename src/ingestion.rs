//! The ingestion pipeline: fetch, chunk, embed, store.
//!
//! [`ingest`] drives one end-to-end build of a collection. Any failure along
//! the way aborts the run and surfaces the error; nothing is retried and no
//! partial collection survives a failed insert.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chunking::split_text;
use crate::dataset::ArticleSource;
use crate::embeddings::Embedder;
use crate::stores::ChunkRecord;
use crate::stores::sqlite::{Collection, SqliteVectorStore};
use crate::types::RagError;

pub const DEFAULT_NUM_ARTICLES: usize = 100;
pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
pub const DEFAULT_COLLECTION: &str = "wikipedia";

/// Characters of chunk text shown in previews and logs.
pub const PREVIEW_CHARS: usize = 80;

/// Tuning knobs for one ingestion run.
#[derive(Clone, Debug)]
pub struct IngestOptions {
    /// How many articles to pull from the source.
    pub num_articles: usize,
    /// Chunk window size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// Name of the collection to create.
    pub collection_name: String,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            num_articles: DEFAULT_NUM_ARTICLES,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            collection_name: DEFAULT_COLLECTION.to_string(),
        }
    }
}

/// Per-article ingestion report.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub article_index: usize,
    pub title: String,
    pub chunk_count: usize,
    /// Flattened preview of the article's first chunk; `None` when the
    /// article produced no chunks.
    pub preview: Option<String>,
}

/// Counters for a completed run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestTelemetry {
    pub articles: usize,
    pub total_chunks: usize,
    pub embedder: String,
    pub dimensions: usize,
    pub duration_ms: u64,
}

/// A freshly built collection plus what went into it.
#[derive(Debug)]
pub struct IngestOutcome {
    pub collection: Collection,
    pub summaries: Vec<ArticleSummary>,
    pub telemetry: IngestTelemetry,
}

struct Pending {
    article_index: usize,
    title: String,
    text: String,
}

/// Builds a new collection from `source`.
///
/// All chunk texts go to the embedder as one batch, and all records land in
/// the store as one transaction. Chunk ids are `chunk0`, `chunk1`, ... in
/// article order, numbered across the whole run.
pub async fn ingest(
    source: &dyn ArticleSource,
    embedder: &dyn Embedder,
    store: &SqliteVectorStore,
    options: &IngestOptions,
) -> Result<IngestOutcome, RagError> {
    // Reject bad window parameters before any network work.
    split_text("", options.chunk_size, options.chunk_overlap)?;

    let started = Instant::now();
    let articles = source.fetch(options.num_articles).await?;

    let mut summaries = Vec::with_capacity(articles.len());
    let mut pending: Vec<Pending> = Vec::new();
    for article in &articles {
        let chunks = split_text(&article.text, options.chunk_size, options.chunk_overlap)?;
        summaries.push(ArticleSummary {
            article_index: article.index,
            title: article.title.clone(),
            chunk_count: chunks.len(),
            preview: chunks.first().map(|chunk| preview(&chunk.text, PREVIEW_CHARS)),
        });
        for chunk in chunks {
            pending.push(Pending {
                article_index: article.index,
                title: article.title.clone(),
                text: chunk.text,
            });
        }
    }

    let texts: Vec<String> = pending.iter().map(|p| p.text.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await?;
    if embeddings.len() != texts.len() {
        return Err(RagError::Embedding(format!(
            "embedder returned {} vectors for {} chunks",
            embeddings.len(),
            texts.len()
        )));
    }

    let collection = store
        .create_collection(&options.collection_name, embedder.dimensions())
        .await?;
    let records: Vec<ChunkRecord> = pending
        .into_iter()
        .zip(embeddings)
        .enumerate()
        .map(|(index, (chunk, embedding))| {
            ChunkRecord::new(
                format!("chunk{index}"),
                chunk.article_index,
                chunk.title,
                chunk.text,
                embedding,
            )
        })
        .collect();
    let total_chunks = records.len();
    collection.add(records).await?;

    let telemetry = IngestTelemetry {
        articles: articles.len(),
        total_chunks,
        embedder: embedder.model_name().to_string(),
        dimensions: embedder.dimensions(),
        duration_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        articles = telemetry.articles,
        chunks = telemetry.total_chunks,
        model = %telemetry.embedder,
        duration_ms = telemetry.duration_ms,
        collection = %options.collection_name,
        "ingestion complete"
    );
    Ok(IngestOutcome {
        collection,
        summaries,
        telemetry,
    })
}

/// Single-line preview of `text`: newlines flattened to spaces, truncated to
/// `max_chars` characters with a trailing ellipsis.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flattened = text.replace(['\n', '\r'], " ");
    let mut out: String = flattened.chars().take(max_chars).collect();
    if flattened.chars().count() > max_chars {
        out.push('…');
    }
    out
}
