//! Wikipedia articles over the Hugging Face datasets API.
//!
//! The datasets server exposes dataset rows through
//! `GET /rows?dataset=..&config=..&split=..&offset=..&length=..`, at most
//! [`MAX_PAGE_SIZE`] rows per response. [`HfWikipediaSource`] walks that
//! endpoint page by page, in order, and maps each row to an [`Article`].

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::dataset::cache::PageCache;
use crate::dataset::{Article, ArticleSource};
use crate::types::RagError;

/// Snapshot of English Wikipedia served by the datasets API (the parquet
/// mirror of the raw wiki dumps).
pub const DATASET: &str = "wikimedia/wikipedia";
pub const CONFIG: &str = "20231101.en";
pub const SPLIT: &str = "train";

/// Public datasets-server endpoint.
pub const BASE_URL: &str = "https://datasets-server.huggingface.co";

/// The server caps `/rows` responses at 100 rows.
pub const MAX_PAGE_SIZE: usize = 100;

const USER_AGENT: &str = concat!("wikirag/", env!("CARGO_PKG_VERSION"));

/// Fetches Wikipedia articles from the datasets server, optionally caching
/// page responses on disk.
#[derive(Clone, Debug)]
pub struct HfWikipediaSource {
    client: reqwest::Client,
    base_url: Url,
    dataset: String,
    config: String,
    split: String,
    page_size: usize,
    cache: Option<PageCache>,
}

impl HfWikipediaSource {
    pub fn new() -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .use_rustls_tls()
            .build()
            .map_err(|err| RagError::SourceUnavailable(err.to_string()))?;
        let base_url = Url::parse(BASE_URL)
            .map_err(|err| RagError::SourceUnavailable(err.to_string()))?;
        Ok(Self {
            client,
            base_url,
            dataset: DATASET.to_string(),
            config: CONFIG.to_string(),
            split: SPLIT.to_string(),
            page_size: MAX_PAGE_SIZE,
            cache: None,
        })
    }

    /// Reuses cached page responses and stores fresh ones under the cache
    /// root.
    #[must_use]
    pub fn with_cache(mut self, cache: PageCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Points the source at a different server; tests aim this at a mock.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Lowers the page size below [`MAX_PAGE_SIZE`]; values are clamped to
    /// the server's limits.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    fn rows_url(&self, offset: usize, length: usize) -> Result<Url, RagError> {
        let mut url = self
            .base_url
            .join("rows")
            .map_err(|err| RagError::SourceUnavailable(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("dataset", &self.dataset)
            .append_pair("config", &self.config)
            .append_pair("split", &self.split)
            .append_pair("offset", &offset.to_string())
            .append_pair("length", &length.to_string());
        Ok(url)
    }

    async fn fetch_page(&self, offset: usize, length: usize) -> Result<Vec<WikiRow>, RagError> {
        if let Some(cache) = &self.cache {
            if let Some(body) = cache
                .load(&self.dataset, &self.config, &self.split, offset, length)
                .await?
            {
                debug!(offset, length, "serving rows page from cache");
                return parse_rows(&body);
            }
        }

        let url = self.rows_url(offset, length)?;
        debug!(%url, "fetching rows page");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| RagError::SourceUnavailable(format!("request to {url} failed: {err}")))?
            .error_for_status()
            .map_err(|err| RagError::SourceUnavailable(err.to_string()))?;
        let body = response
            .text()
            .await
            .map_err(|err| RagError::SourceUnavailable(err.to_string()))?;
        let rows = parse_rows(&body)?;

        if let Some(cache) = &self.cache {
            cache
                .store(&self.dataset, &self.config, &self.split, offset, length, &body)
                .await?;
        }
        Ok(rows)
    }
}

#[async_trait]
impl ArticleSource for HfWikipediaSource {
    async fn fetch(&self, count: usize) -> Result<Vec<Article>, RagError> {
        let mut articles: Vec<Article> = Vec::with_capacity(count);
        while articles.len() < count {
            let offset = articles.len();
            let length = self.page_size.min(count - articles.len());
            let rows = self.fetch_page(offset, length).await?;
            let received = rows.len();
            for row in rows.into_iter().take(length) {
                let index = articles.len();
                articles.push(Article {
                    index,
                    title: row.title,
                    text: row.text,
                });
            }
            if received < length {
                return Err(RagError::SourceExhausted {
                    requested: count,
                    available: articles.len(),
                });
            }
        }
        info!(count = articles.len(), dataset = %self.dataset, "fetched articles");
        Ok(articles)
    }
}

fn parse_rows(body: &str) -> Result<Vec<WikiRow>, RagError> {
    let response: RowsResponse = serde_json::from_str(body)
        .map_err(|err| RagError::SourceUnavailable(format!("malformed rows response: {err}")))?;
    Ok(response
        .rows
        .into_iter()
        .map(|envelope| {
            if !envelope.truncated_cells.is_empty() {
                debug!(cells = ?envelope.truncated_cells, "dataset API truncated row cells");
            }
            envelope.row
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct RowsResponse {
    rows: Vec<RowEnvelope>,
}

#[derive(Debug, Deserialize)]
struct RowEnvelope {
    row: WikiRow,
    #[serde(default)]
    truncated_cells: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WikiRow {
    #[serde(default)]
    title: String,
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tempfile::tempdir;

    fn rows_body(start_idx: usize, rows: &[(&str, &str)]) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = rows
            .iter()
            .enumerate()
            .map(|(i, (title, text))| {
                serde_json::json!({
                    "row_idx": start_idx + i,
                    "row": {
                        "id": (start_idx + i).to_string(),
                        "url": format!("https://en.wikipedia.org/wiki/{title}"),
                        "title": title,
                        "text": text,
                    },
                    "truncated_cells": [],
                })
            })
            .collect();
        serde_json::json!({ "features": [], "rows": rows })
    }

    fn source_for(server: &MockServer) -> HfWikipediaSource {
        HfWikipediaSource::new()
            .unwrap()
            .with_base_url(Url::parse(&server.base_url()).unwrap())
    }

    #[tokio::test]
    async fn maps_rows_to_articles_in_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rows")
                    .query_param("dataset", DATASET)
                    .query_param("config", CONFIG)
                    .query_param("split", SPLIT)
                    .query_param("offset", "0")
                    .query_param("length", "2");
                then.status(200)
                    .json_body(rows_body(0, &[("Alpha", "alpha text"), ("Beta", "beta text")]));
            })
            .await;

        let articles = source_for(&server).fetch(2).await.unwrap();
        mock.assert_async().await;

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].index, 0);
        assert_eq!(articles[0].title, "Alpha");
        assert_eq!(articles[1].index, 1);
        assert_eq!(articles[1].text, "beta text");
    }

    #[tokio::test]
    async fn pages_through_the_corpus() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rows")
                    .query_param("offset", "0")
                    .query_param("length", "2");
                then.status(200).json_body(rows_body(0, &[("A", "a"), ("B", "b")]));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rows")
                    .query_param("offset", "2")
                    .query_param("length", "1");
                then.status(200).json_body(rows_body(2, &[("C", "c")]));
            })
            .await;

        let articles = source_for(&server).with_page_size(2).fetch(3).await.unwrap();
        first.assert_async().await;
        second.assert_async().await;

        let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["A", "B", "C"]);
        let indices: Vec<usize> = articles.iter().map(|a| a.index).collect();
        assert_eq!(indices, [0, 1, 2]);
    }

    #[tokio::test]
    async fn short_supply_is_exhaustion() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rows");
                then.status(200).json_body(rows_body(0, &[("Only", "one")]));
            })
            .await;

        let err = source_for(&server).fetch(3).await.unwrap_err();
        assert!(matches!(
            err,
            RagError::SourceExhausted {
                requested: 3,
                available: 1,
            }
        ));
    }

    #[tokio::test]
    async fn server_errors_are_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rows");
                then.status(500);
            })
            .await;

        let err = source_for(&server).fetch(1).await.unwrap_err();
        assert!(matches!(err, RagError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/rows");
                then.status(200).json_body(rows_body(0, &[("Cached", "body")]));
            })
            .await;
        let dir = tempdir().unwrap();

        let first = source_for(&server).with_cache(PageCache::new(dir.path()));
        let articles = first.fetch(1).await.unwrap();
        assert_eq!(articles[0].title, "Cached");
        assert_eq!(mock.hits_async().await, 1);

        let second = source_for(&server).with_cache(PageCache::new(dir.path()));
        let articles = second.fetch(1).await.unwrap();
        assert_eq!(articles[0].title, "Cached");
        assert_eq!(mock.hits_async().await, 1);
    }
}
