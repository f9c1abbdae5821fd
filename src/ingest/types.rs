// src/ingest/types.rs
use std::sync::Arc;

use anyhow::Result;

use crate::models::RawArticle;

/// Anything that yields a batch of freshly scraped articles.
#[async_trait::async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<RawArticle>>;
    fn name(&self) -> &str;
}

pub type SharedSource = Arc<dyn ArticleSource>;
