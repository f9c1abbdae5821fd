//! Shared application state handed to handlers and background jobs.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Semaphore;

use crate::config::FeedConfig;
use crate::error;
use crate::ingest::providers::RssSource;
use crate::ingest::types::SharedSource;
use crate::ingest::{collect_once, CollectParams, CollectionReport};
use crate::store::{build_store, SharedStore};
use crate::summarizer::{build_summarizer, SharedSummarizer};
use crate::tasks::{InMemoryTaskStore, SharedTaskStore};

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub tasks: SharedTaskStore,
    /// Bounds concurrently running searches.
    pub search_permits: Arc<Semaphore>,
    pub summarizer: SharedSummarizer,
    pub sources: Arc<Vec<SharedSource>>,
    pub cfg: Arc<FeedConfig>,
}

impl AppState {
    /// Wire explicit collaborators (tests, embedding). Tasks live in memory, bounded by
    /// the `[tasks]` section.
    pub fn new(
        store: SharedStore,
        summarizer: SharedSummarizer,
        sources: Vec<SharedSource>,
        cfg: FeedConfig,
    ) -> Self {
        Self {
            store,
            tasks: Arc::new(InMemoryTaskStore::from_config(&cfg.tasks)),
            search_permits: Arc::new(Semaphore::new(cfg.tasks.max_concurrent.max(1))),
            summarizer,
            sources: Arc::new(sources),
            cfg: Arc::new(cfg),
        }
    }

    pub fn with_tasks(mut self, tasks: SharedTaskStore) -> Self {
        self.tasks = tasks;
        self
    }

    /// Build store, summarizer and RSS sources from configuration.
    pub async fn from_config(cfg: FeedConfig) -> Result<Self> {
        let store = build_store(&cfg.store).await?;
        let summarizer = build_summarizer(&cfg.summarizer)?;
        let mut sources: Vec<SharedSource> = Vec::with_capacity(cfg.sources.len());
        for s in &cfg.sources {
            sources.push(Arc::new(RssSource::from_url(&s.name, &s.url)?));
        }
        tracing::info!(
            target: "state",
            sources = sources.len(),
            summarizer = summarizer.name(),
            store = store.backend(),
            "application state ready"
        );
        Ok(Self::new(store, summarizer, sources, cfg))
    }

    pub fn collect_params(&self) -> CollectParams {
        CollectParams::from_config(&self.cfg)
    }

    pub fn hot_count(&self) -> usize {
        self.cfg.ranking.hot_count
    }

    pub async fn collect_once(&self) -> error::Result<CollectionReport> {
        collect_once(
            &self.sources,
            self.summarizer.as_ref(),
            self.store.as_ref(),
            &self.collect_params(),
        )
        .await
    }
}
