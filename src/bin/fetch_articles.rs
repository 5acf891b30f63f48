//! Prints the first few dataset articles without touching the store.
//!
//! Handy for eyeballing what the corpus actually contains before a full
//! ingestion run. Shares the response cache with the main binary.

use wikirag::dataset::{Article, ArticleSource, HfWikipediaSource, PageCache};
use wikirag::ingestion::preview;
use wikirag::types::RagError;

const NUM_ITEMS: usize = 10;
const CACHE_DIR: &str = "wikirag_cache";
const SEPARATOR: &str = "----------------------------------------";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();
    eprintln!("[INFO] Script started");

    let articles = match run().await {
        Ok(articles) => articles,
        Err(err) => {
            eprintln!("[ERROR] {err}");
            std::process::exit(1);
        }
    };

    if articles.is_empty() {
        eprintln!("[WARNING] No items fetched.");
        return;
    }
    eprintln!("[INFO] Successfully fetched {} items", articles.len());
    eprintln!("[INFO] Sample item title: {}", articles[0].title);

    for article in &articles {
        println!("Item {}:", article.index + 1);
        println!("Title: {}", article.title);
        println!("{}", preview(&article.text, 200));
        println!("{SEPARATOR}");
    }
}

async fn run() -> Result<Vec<Article>, RagError> {
    let source = HfWikipediaSource::new()?.with_cache(PageCache::new(CACHE_DIR));
    source.fetch(NUM_ITEMS).await
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
