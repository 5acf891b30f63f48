//! Vector storage.
//!
//! A store holds named collections; a collection holds chunk rows plus their
//! embeddings and answers nearest-neighbor queries by cosine distance. The
//! only backend is [`sqlite::SqliteVectorStore`], which keeps everything in
//! a single SQLite database (in memory by default) through the sqlite-vec
//! extension.

use serde::{Deserialize, Serialize};

pub mod sqlite;

pub use sqlite::{Collection, SqliteVectorStore};

/// One embedded chunk, ready to insert into a collection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Collection-unique chunk id, `chunk0`, `chunk1`, ...
    pub id: String,
    /// Position of the source article in the fetched batch.
    pub article_index: usize,
    /// Title of the source article.
    pub title: String,
    /// Chunk text.
    pub text: String,
    pub embedding: Vec<f32>,
}

impl ChunkRecord {
    pub fn new(
        id: impl Into<String>,
        article_index: usize,
        title: impl Into<String>,
        text: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            article_index,
            title: title.into(),
            text: text.into(),
            embedding,
        }
    }
}

/// One query match: the stored chunk fields plus its cosine distance to the
/// query vector. Smaller distance means more similar.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryHit {
    pub id: String,
    pub article_index: usize,
    pub title: String,
    pub text: String,
    pub distance: f32,
}
