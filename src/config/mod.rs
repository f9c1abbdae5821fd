// src/config/mod.rs
//! Service configuration loaded from TOML.
//!
//! Lookup order:
//! 1) `$FEED_CONFIG_PATH` (must exist if set)
//! 2) `config/feed.toml`
//! 3) built-in defaults
//!
//! Afterwards `FEED_CLUSTER_THRESHOLD` and `FEED_HOT_COUNT` override the file values.

pub mod summarizer;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::analyze::cluster::DEFAULT_CLUSTER_THRESHOLD;
use crate::analyze::rank::DEFAULT_HOT_COUNT;
use crate::analyze::similarity::SimilarityParams;

pub use summarizer::SummarizerConfig;

pub const DEFAULT_FEED_CONFIG_PATH: &str = "config/feed.toml";
pub const ENV_FEED_CONFIG_PATH: &str = "FEED_CONFIG_PATH";
pub const ENV_CLUSTER_THRESHOLD: &str = "FEED_CLUSTER_THRESHOLD";
pub const ENV_HOT_COUNT: &str = "FEED_HOT_COUNT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub similarity: SimilarityParams,
    pub clustering: ClusteringConfig,
    pub ranking: RankingConfig,
    pub collection: CollectionConfig,
    pub store: StoreConfig,
    pub summarizer: SummarizerConfig,
    pub tasks: TasksConfig,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub threshold: f64,
    /// Distinct outlets required before a group is published.
    pub min_sources: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CLUSTER_THRESHOLD,
            min_sources: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub hot_count: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            hot_count: DEFAULT_HOT_COUNT,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    /// Summary points requested per blink.
    pub points: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 2 * 3600,
            points: 5,
        }
    }
}

/// Background search limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
    /// Tasks kept in memory, finished ones included.
    pub max_tasks: usize,
    /// Finished tasks older than this are dropped on the next submission.
    pub ttl_secs: u64,
    /// Searches allowed to fetch and publish at the same time.
    pub max_concurrent: usize,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            max_tasks: 256,
            ttl_secs: 3600,
            max_concurrent: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            dir: PathBuf::from("data/blinks"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
}

impl FeedConfig {
    /// Load from an explicit TOML file, then apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading feed config from {}", path.display()))?;
        let mut cfg = Self::parse(&content)?;
        cfg.apply_env();
        Ok(cfg)
    }

    /// Env path, then `config/feed.toml`, then defaults.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_FEED_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_FEED_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_FEED_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from(&default_path);
        }
        let mut cfg = Self::default();
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn parse(s: &str) -> Result<Self> {
        let mut cfg: FeedConfig = toml::from_str(s).context("parsing feed config toml")?;
        cfg.sanitize();
        Ok(cfg)
    }

    fn sanitize(&mut self) {
        self.clustering.threshold = self.clustering.threshold.clamp(0.0, 1.0);
        self.clustering.min_sources = self.clustering.min_sources.max(1);
        self.similarity.text_weight = self.similarity.text_weight.max(0.0);
        self.similarity.keyword_weight = self.similarity.keyword_weight.max(0.0);
        self.collection.interval_secs = self.collection.interval_secs.max(60);
        self.collection.points = self.collection.points.max(1);
        self.tasks.max_tasks = self.tasks.max_tasks.max(1);
        self.tasks.max_concurrent = self.tasks.max_concurrent.max(1);
        self.sources
            .retain(|s| !s.name.trim().is_empty() && !s.url.trim().is_empty());
    }

    fn apply_env(&mut self) {
        if let Some(t) = parse_threshold_env(std::env::var(ENV_CLUSTER_THRESHOLD).ok()) {
            self.clustering.threshold = t;
        }
        if let Some(n) = std::env::var(ENV_HOT_COUNT)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            self.ranking.hot_count = n;
        }
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_threshold_env(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}
