//! SQLite-backed vector store using the sqlite-vec extension.
//!
//! Each collection is a pair of tables: `"{name}"` for chunk rows and
//! `"{name}_embeddings"`, a `vec0` virtual table keyed by the same rowid.
//! Similarity queries rank with `vec_distance_cosine` directly in SQL.

use std::fmt;
use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::Once;

use tokio_rusqlite::{Connection, OptionalExtension, ffi};
use tracing::debug;

use crate::stores::{ChunkRecord, QueryHit};
use crate::types::RagError;

/// Handle to one SQLite database that can hold any number of collections.
#[derive(Clone)]
pub struct SqliteVectorStore {
    conn: Connection,
}

impl SqliteVectorStore {
    /// Opens (or creates) a database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RagError> {
        register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Self::from_connection(conn).await
    }

    /// Opens a fresh in-memory database. Contents are gone when the last
    /// clone of the handle drops.
    pub async fn open_in_memory() -> Result<Self, RagError> {
        register_sqlite_vec()?;
        let conn = Connection::open_in_memory()
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Self::from_connection(conn).await
    }

    async fn from_connection(conn: Connection) -> Result<Self, RagError> {
        let version = conn
            .call(|conn| {
                conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        debug!(%version, "sqlite-vec extension loaded");
        Ok(Self { conn })
    }

    /// Creates the tables for a new collection and returns a handle to it.
    ///
    /// Collection names become table names, so only `[A-Za-z_][A-Za-z0-9_]*`
    /// is accepted. Creating a name that already exists in this database
    /// fails with [`RagError::CollectionExists`] and leaves the existing
    /// collection untouched.
    pub async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
    ) -> Result<Collection, RagError> {
        validate_collection_name(name)?;
        if dimensions == 0 {
            return Err(RagError::Storage(
                "collection dimensions must be at least 1".into(),
            ));
        }

        let table = name.to_string();
        let created = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(tokio_rusqlite::Error::Rusqlite)?;
                let existing: Option<String> = tx
                    .query_row(
                        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                        [&table],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                if existing.is_some() {
                    return Ok(false);
                }
                tx.execute(
                    &format!(
                        "CREATE TABLE \"{table}\" (\
                         id TEXT NOT NULL UNIQUE, \
                         article_index INTEGER NOT NULL, \
                         title TEXT NOT NULL, \
                         content TEXT NOT NULL)"
                    ),
                    [],
                )
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
                tx.execute(
                    &format!(
                        "CREATE VIRTUAL TABLE \"{table}_embeddings\" \
                         USING vec0(embedding float[{dimensions}])"
                    ),
                    [],
                )
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
                tx.commit().map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(true)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;

        if !created {
            return Err(RagError::CollectionExists(name.to_string()));
        }
        debug!(collection = name, dimensions, "created collection");
        Ok(Collection {
            conn: self.conn.clone(),
            name: name.to_string(),
            dimensions,
        })
    }
}

/// Handle to one collection. Clones share the underlying connection.
#[derive(Clone)]
pub struct Collection {
    conn: Connection,
    name: String,
    dimensions: usize,
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Inserts all `records` in a single transaction.
    ///
    /// Either every record lands or none do: a dimension mismatch is caught
    /// up front, and a constraint failure (such as a duplicate id) rolls the
    /// whole batch back.
    pub async fn add(&self, records: Vec<ChunkRecord>) -> Result<(), RagError> {
        if records.is_empty() {
            return Ok(());
        }
        for record in &records {
            if record.embedding.len() != self.dimensions {
                return Err(RagError::DimensionMismatch {
                    expected: self.dimensions,
                    got: record.embedding.len(),
                });
            }
        }

        // Serialize embeddings up front so the closure below only talks to
        // SQLite.
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let embedding_json = serde_json::to_string(&record.embedding)
                .map_err(|err| RagError::Storage(err.to_string()))?;
            rows.push((record, embedding_json));
        }

        let table = self.name.clone();
        let inserted = rows.len();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(tokio_rusqlite::Error::Rusqlite)?;
                {
                    let mut insert_chunk = tx
                        .prepare(&format!(
                            "INSERT INTO \"{table}\" (id, article_index, title, content) \
                             VALUES (?1, ?2, ?3, ?4)"
                        ))
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    let mut insert_embedding = tx
                        .prepare(&format!(
                            "INSERT INTO \"{table}_embeddings\" (rowid, embedding) \
                             VALUES (?1, ?2)"
                        ))
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    for (record, embedding_json) in &rows {
                        insert_chunk
                            .execute((
                                record.id.as_str(),
                                record.article_index as i64,
                                record.title.as_str(),
                                record.text.as_str(),
                            ))
                            .map_err(tokio_rusqlite::Error::Rusqlite)?;
                        insert_embedding
                            .execute((tx.last_insert_rowid(), embedding_json.as_str()))
                            .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    }
                }
                tx.commit().map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        debug!(collection = %self.name, inserted, "inserted chunk rows");
        Ok(())
    }

    /// Returns the `k` stored chunks nearest to `embedding`, closest first.
    ///
    /// Asking for more results than the collection holds (including asking
    /// an empty collection) fails with [`RagError::Query`] rather than
    /// silently returning fewer.
    pub async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<QueryHit>, RagError> {
        if embedding.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                got: embedding.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }
        let stored = self.count().await?;
        if stored == 0 {
            return Err(RagError::Query(format!(
                "collection '{}' is empty",
                self.name
            )));
        }
        if k > stored {
            return Err(RagError::Query(format!(
                "requested {k} results but collection '{}' holds only {stored} chunks",
                self.name
            )));
        }

        let embedding_json =
            serde_json::to_string(embedding).map_err(|err| RagError::Storage(err.to_string()))?;
        let table = self.name.clone();
        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT c.id, c.article_index, c.title, c.content, \
                         vec_distance_cosine(e.embedding, vec_f32(?1)) AS distance \
                         FROM \"{table}\" c \
                         JOIN \"{table}_embeddings\" e ON e.rowid = c.rowid \
                         ORDER BY distance ASC \
                         LIMIT {k}"
                    ))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let rows = stmt
                    .query_map([&embedding_json], |row| {
                        Ok(QueryHit {
                            id: row.get(0)?,
                            article_index: row.get::<_, i64>(1)? as usize,
                            title: row.get(2)?,
                            text: row.get(3)?,
                            distance: row.get(4)?,
                        })
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let mut hits = Vec::new();
                for row in rows {
                    hits.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(hits)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    /// Number of chunks stored in this collection.
    pub async fn count(&self) -> Result<usize, RagError> {
        let table = self.name.clone();
        self.conn
            .call(move |conn| {
                let count: i64 = conn
                    .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
                        row.get(0)
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }
}

fn validate_collection_name(name: &str) -> Result<(), RagError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(RagError::InvalidCollectionName(name.to_string()))
    }
}

fn register_sqlite_vec() -> Result<(), RagError> {
    use std::sync::Mutex;

    static INIT: Once = Once::new();
    static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

    INIT.call_once(|| {
        let result = unsafe {
            type SqliteExtensionInit = unsafe extern "C" fn(
                *mut ffi::sqlite3,
                *mut *const c_char,
                *const ffi::sqlite3_api_routines,
            ) -> i32;

            let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
            let init_fn: SqliteExtensionInit =
                transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
            let rc = ffi::sqlite3_auto_extension(Some(init_fn));
            if rc != 0 {
                Err(format!(
                    "failed to register sqlite-vec extension (code {rc})"
                ))
            } else {
                Ok(())
            }
        };
        *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
    });

    INIT_RESULT
        .lock()
        .expect("init result mutex poisoned")
        .clone()
        .expect("init was called but result not set")
        .map_err(RagError::Storage)
}
