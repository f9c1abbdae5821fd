// src/ingest/pipeline.rs
//! Collection run: fetch, cluster, dedup, summarize, publish.
//!
//! Every group is processed in isolation. A summarizer failure or a store write error
//! drops that group only; the run carries on with its siblings.
//!
//! Runs may overlap (scheduler and search tasks). The final title check and the insert
//! happen under one process-wide gate, so an event is stored at most once.

use chrono::{DateTime, SecondsFormat, Utc};
use metrics::{counter, gauge};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::analyze::cluster::{cluster_with, publishable, ClusterParams};
use crate::analyze::similarity::{similarity_with, SimilarityParams};
use crate::config::FeedConfig;
use crate::error::{BlinkError, Result};
use crate::ingest::types::SharedSource;
use crate::ingest::{ensure_metrics_described, fetch_all, prepare_articles};
use crate::models::{content_hash, ArticleGroup, BlinkRecord, RawArticle};
use crate::store::BlinkStore;
use crate::summarizer::Summarizer;

static PUBLISH_GATE: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Knobs of one collection run.
#[derive(Debug, Clone, Copy)]
pub struct CollectParams {
    pub threshold: f64,
    pub min_sources: usize,
    pub points: usize,
    pub similarity: SimilarityParams,
}

impl Default for CollectParams {
    fn default() -> Self {
        Self::from_config(&FeedConfig::default())
    }
}

impl CollectParams {
    pub fn from_config(cfg: &FeedConfig) -> Self {
        Self {
            threshold: cfg.clustering.threshold,
            min_sources: cfg.clustering.min_sources,
            points: cfg.collection.points,
            similarity: cfg.similarity,
        }
    }

    fn cluster_params(&self) -> ClusterParams {
        ClusterParams {
            threshold: self.threshold,
            similarity: self.similarity,
        }
    }

    fn same_event(&self, a: &str, b: &str) -> bool {
        similarity_with(a, b, &self.similarity) > self.threshold
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReport {
    pub fetched: usize,
    pub source_errors: usize,
    pub groups: usize,
    /// Ids of blinks created by this run, in publication order.
    pub published: Vec<String>,
    pub skipped_min_sources: usize,
    pub skipped_intra_run: usize,
    pub skipped_cross_run: usize,
    pub skipped_existing: usize,
    pub upstream_failures: usize,
    pub store_errors: usize,
}

/// Fetch from every source and publish what survives.
pub async fn collect_once(
    sources: &[SharedSource],
    summarizer: &dyn Summarizer,
    store: &dyn BlinkStore,
    params: &CollectParams,
) -> Result<CollectionReport> {
    ensure_metrics_described();
    counter!("collect_runs_total").increment(1);

    let (articles, source_errors) = fetch_all(sources).await;
    let mut report = publish_articles(articles, summarizer, store, params).await?;
    report.source_errors = source_errors;

    gauge!("collect_last_run_ts").set(Utc::now().timestamp() as f64);
    info!(
        target: "collect",
        fetched = report.fetched,
        source_errors = report.source_errors,
        groups = report.groups,
        published = report.published.len(),
        skipped_min_sources = report.skipped_min_sources,
        skipped_intra_run = report.skipped_intra_run,
        skipped_cross_run = report.skipped_cross_run,
        upstream_failures = report.upstream_failures,
        "collection run finished"
    );
    Ok(report)
}

/// Cluster already fetched articles and publish every new, well-sourced group.
///
/// Only reading existing titles from the store can fail the whole call.
pub async fn publish_articles(
    articles: Vec<RawArticle>,
    summarizer: &dyn Summarizer,
    store: &dyn BlinkStore,
    params: &CollectParams,
) -> Result<CollectionReport> {
    ensure_metrics_described();

    let mut report = CollectionReport {
        fetched: articles.len(),
        ..CollectionReport::default()
    };

    let articles = prepare_articles(articles);
    let groups = cluster_with(&articles, &params.cluster_params());
    report.groups = groups.len();

    let (groups, dropped) = publishable(groups, params.min_sources);
    report.skipped_min_sources = dropped;
    skipped("min_sources", dropped);

    let existing = store.titles().await?;
    let mut published_titles: Vec<String> = Vec::new();
    let now = Utc::now();

    for group in groups {
        let title = group.seed().title.clone();
        let seed_hash = content_hash([title.as_str()]);

        if published_titles.iter().any(|t| params.same_event(&title, t)) {
            report.skipped_intra_run += 1;
            skipped("intra_run", 1);
            continue;
        }
        if existing.iter().any(|t| params.same_event(&title, t)) {
            report.skipped_cross_run += 1;
            skipped("cross_run", 1);
            continue;
        }

        let (points, category) = match summarize(&group, summarizer, params.points).await {
            Ok(v) => v,
            Err(e) => {
                report.upstream_failures += 1;
                counter!("collect_upstream_failures_total").increment(1);
                warn!(
                    target: "collect",
                    seed = %seed_hash,
                    members = group.len(),
                    error = %e,
                    "group skipped"
                );
                continue;
            }
        };

        let record = build_record(&group, points, category, now);
        let id = record.id.clone();

        // titles may have changed while summarizing
        let _gate = PUBLISH_GATE.lock().await;
        let current = match store.titles().await {
            Ok(t) => t,
            Err(e) => {
                report.store_errors += 1;
                warn!(target: "collect", blink_id = %id, error = %e, "reading titles failed");
                continue;
            }
        };
        if current.iter().any(|t| params.same_event(&title, t)) {
            report.skipped_cross_run += 1;
            skipped("cross_run", 1);
            continue;
        }

        match store.insert_new(record).await {
            Ok(true) => {
                counter!("collect_groups_published_total").increment(1);
                info!(target: "collect", blink_id = %id, sources = group.distinct_sources().len(), "blink published");
                report.published.push(id);
                published_titles.push(title);
            }
            Ok(false) => {
                report.skipped_existing += 1;
                skipped("exists", 1);
            }
            Err(e) => {
                report.store_errors += 1;
                warn!(target: "collect", blink_id = %id, error = %e, "storing blink failed");
            }
        }
    }

    Ok(report)
}

fn skipped(reason: &'static str, n: usize) {
    if n > 0 {
        counter!("collect_groups_skipped_total", "reason" => reason).increment(n as u64);
    }
}

async fn summarize(
    group: &ArticleGroup,
    summarizer: &dyn Summarizer,
    n: usize,
) -> Result<(Vec<String>, String)> {
    let text = group.combined_text();
    let points = summarizer
        .points(&text, n)
        .await
        .map_err(|e| BlinkError::UpstreamFailure(format!("{} points: {e:#}", summarizer.name())))?;
    let category = summarizer
        .category(&text)
        .await
        .map_err(|e| BlinkError::UpstreamFailure(format!("{} category: {e:#}", summarizer.name())))?;
    Ok((points, category))
}

/// Blink for a group. The id depends only on the member set, so re-clustering the
/// same articles maps onto the same record.
pub fn build_record(
    group: &ArticleGroup,
    points: Vec<String>,
    category: String,
    now: DateTime<Utc>,
) -> BlinkRecord {
    let mut ids: Vec<&str> = group.members().iter().map(|m| m.id.as_str()).collect();
    ids.sort_unstable();

    let mut record = BlinkRecord::new(content_hash(ids), group.seed().title.clone());
    record.published_at = Some(
        group
            .latest_published()
            .to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    record.timestamp = Some(now.to_rfc3339_opts(SecondsFormat::Secs, true));

    let mut sources: Vec<Value> = Vec::new();
    for name in group.distinct_sources() {
        if let Some(m) = group
            .members()
            .iter()
            .find(|m| m.source.eq_ignore_ascii_case(name))
        {
            sources.push(json!({ "name": m.source, "url": m.url }));
        }
    }
    record.sources = sources;
    record.content.insert("points".into(), json!(points));
    record.content.insert("category".into(), json!(category));
    record
}
