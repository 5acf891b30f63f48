//! On-disk cache for fetched dataset row pages.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::types::RagError;

/// Filesystem-backed cache for `/rows` responses.
///
/// Pages are keyed by dataset, config, split, offset, and length, normalized
/// into deterministic file names so repeated runs reuse previously fetched
/// pages instead of hitting the network.
#[derive(Clone, Debug)]
pub struct PageCache {
    root: PathBuf,
}

impl PageCache {
    /// Creates a cache rooted at the provided path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Computes the cache file path for one page of rows.
    pub fn page_path(
        &self,
        dataset: &str,
        config: &str,
        split: &str,
        offset: usize,
        length: usize,
    ) -> PathBuf {
        let file_name = format!(
            "{}_{}_{}_rows_{offset}_{length}.json",
            sanitize_component(dataset),
            sanitize_component(config),
            sanitize_component(split),
        );
        self.root.join(file_name)
    }

    /// Loads a cached page body, if one exists.
    pub async fn load(
        &self,
        dataset: &str,
        config: &str,
        split: &str,
        offset: usize,
        length: usize,
    ) -> Result<Option<String>, RagError> {
        let path = self.page_path(dataset, config, split, offset, length);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path).await?))
    }

    /// Persists a page body for later runs.
    pub async fn store(
        &self,
        dataset: &str,
        config: &str,
        split: &str,
        offset: usize,
        length: usize,
        body: &str,
    ) -> Result<(), RagError> {
        let path = self.page_path(dataset, config, split, offset, length);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, body).await?;
        Ok(())
    }
}

fn sanitize_component(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn page_path_sanitizes_components() {
        let cache = PageCache::new("tmp");
        let path = cache.page_path("wikimedia/wikipedia", "20231101.en", "train", 0, 100);
        assert!(path.ends_with("wikimedia_wikipedia_20231101.en_train_rows_0_100.json"));
    }

    #[tokio::test]
    async fn load_misses_before_store_and_hits_after() {
        let dir = tempdir().unwrap();
        let cache = PageCache::new(dir.path());

        let miss = cache.load("d", "c", "s", 0, 10).await.unwrap();
        assert!(miss.is_none());

        cache.store("d", "c", "s", 0, 10, "{\"rows\":[]}").await.unwrap();
        let hit = cache.load("d", "c", "s", 0, 10).await.unwrap();
        assert_eq!(hit.as_deref(), Some("{\"rows\":[]}"));
    }

    #[tokio::test]
    async fn pages_do_not_collide() {
        let dir = tempdir().unwrap();
        let cache = PageCache::new(dir.path());

        cache.store("d", "c", "s", 0, 10, "first").await.unwrap();
        cache.store("d", "c", "s", 10, 10, "second").await.unwrap();

        assert_eq!(
            cache.load("d", "c", "s", 0, 10).await.unwrap().as_deref(),
            Some("first")
        );
        assert_eq!(
            cache.load("d", "c", "s", 10, 10).await.unwrap().as_deref(),
            Some("second")
        );
    }
}
