//! Interactive Wikipedia retrieval demo.
//!
//! Articles are fetched from the Hugging Face datasets API, split into
//! overlapping character chunks, embedded in one batch, and stored in a
//! named collection backed by SQLite + sqlite-vec. A small query loop then
//! answers free-text questions with the K nearest chunks.
//!
//! ```text
//! dataset::HfWikipediaSource ──► Vec<Article> ──► chunking::split_text
//!            │                                            │
//!            └─► dataset::PageCache (on disk)             ▼
//!                                         ingestion::ingest ── chunk<N> ids
//!                                                  │
//!                                 embeddings::Embedder (single batch call)
//!                                                  │
//!                                                  ▼
//!                              stores::sqlite::Collection (vec0 tables)
//!                                                  │
//!                                                  ▼
//!                                repl::QueryLoop (K nearest, rendered)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use wikirag::dataset::StaticArticleSource;
//! use wikirag::embeddings::{Embedder, hashing::HashingEmbedder};
//! use wikirag::ingestion::{IngestOptions, ingest};
//! use wikirag::stores::sqlite::SqliteVectorStore;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), wikirag::RagError> {
//!     let source = StaticArticleSource::from_pairs([(
//!         "Ada Lovelace",
//!         "Ada Lovelace described the first published algorithm intended \
//!          to be carried out by a machine.",
//!     )]);
//!     let embedder = Arc::new(HashingEmbedder::default());
//!     let store = SqliteVectorStore::open_in_memory().await?;
//!
//!     let options = IngestOptions {
//!         num_articles: 1,
//!         chunk_size: 60,
//!         chunk_overlap: 10,
//!         collection_name: "demo".to_string(),
//!     };
//!     let outcome = ingest(&source, embedder.as_ref(), &store, &options).await?;
//!
//!     let query = embedder
//!         .embed_batch(&["first published algorithm".to_string()])
//!         .await?;
//!     let hits = outcome.collection.query(&query[0], 1).await?;
//!     println!("{}", hits[0].text);
//!     Ok(())
//! }
//! ```
//!
//! The `wikirag` binary wires the same pieces against the live Wikipedia
//! snapshot and then hands the collection to [`repl::QueryLoop`].

pub mod chunking;
pub mod dataset;
pub mod embeddings;
pub mod ingestion;
pub mod repl;
pub mod stores;
pub mod types;

pub use chunking::{Chunk, split_text};
pub use dataset::{Article, ArticleSource, StaticArticleSource};
pub use embeddings::Embedder;
pub use ingestion::{IngestOptions, IngestOutcome, ingest};
pub use repl::QueryLoop;
pub use stores::sqlite::{Collection, SqliteVectorStore};
pub use stores::{ChunkRecord, QueryHit};
pub use types::RagError;
