//! Greedy seed-based clustering of raw articles.
//!
//! Articles are visited in input order. Each unconsumed article seeds a new group and
//! pulls in every later unconsumed article whose title similarity *to the seed* exceeds
//! the threshold. Members are never compared with each other, so the result depends on
//! input order; callers that need a stable grouping must pass a stable order.

use metrics::histogram;
use tracing::debug;

use crate::analyze::similarity::{similarity_with, SimilarityParams};
use crate::models::{ArticleGroup, RawArticle};

pub const DEFAULT_CLUSTER_THRESHOLD: f64 = 0.6;

#[derive(Clone, Copy, Debug)]
pub struct ClusterParams {
    /// Strict lower bound: a candidate joins when `similarity > threshold`.
    pub threshold: f64,
    pub similarity: SimilarityParams,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CLUSTER_THRESHOLD,
            similarity: SimilarityParams::default(),
        }
    }
}

/// Cluster with default similarity params.
pub fn cluster(articles: &[RawArticle], threshold: f64) -> Vec<ArticleGroup> {
    cluster_with(
        articles,
        &ClusterParams {
            threshold,
            ..ClusterParams::default()
        },
    )
}

/// Partition `articles` into groups. Every article lands in exactly one group;
/// singleton groups are emitted too.
pub fn cluster_with(articles: &[RawArticle], params: &ClusterParams) -> Vec<ArticleGroup> {
    let mut consumed = vec![false; articles.len()];
    let mut groups = Vec::new();

    for i in 0..articles.len() {
        if consumed[i] {
            continue;
        }
        consumed[i] = true;
        let seed = &articles[i];
        let mut group = ArticleGroup::with_seed(seed.clone());

        for j in (i + 1)..articles.len() {
            if consumed[j] {
                continue;
            }
            let sim = similarity_with(&seed.title, &articles[j].title, &params.similarity);
            if sim > params.threshold {
                consumed[j] = true;
                group.push(articles[j].clone());
            }
        }

        histogram!("cluster_group_size").record(group.len() as f64);
        groups.push(group);
    }

    debug!(
        target: "cluster",
        articles = articles.len(),
        groups = groups.len(),
        threshold = params.threshold,
        "clustering finished"
    );
    groups
}

/// Keep groups backed by at least `min_sources` distinct outlets.
pub fn publishable(groups: Vec<ArticleGroup>, min_sources: usize) -> (Vec<ArticleGroup>, usize) {
    let before = groups.len();
    let kept: Vec<ArticleGroup> = groups
        .into_iter()
        .filter(|g| g.distinct_sources().len() >= min_sources)
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn art(title: &str, source: &str) -> RawArticle {
        RawArticle::new(title, format!("https://{source}.test/{title}"), source)
    }

    fn titles(g: &ArticleGroup) -> Vec<&str> {
        g.members().iter().map(|m| m.title.as_str()).collect()
    }

    #[test]
    fn groups_near_duplicates_and_keeps_singletons() {
        let input = vec![
            art("Earthquake of magnitude 7 hits northern Chile", "a"),
            art("Parliament approves new budget", "b"),
            art("Magnitude 7 earthquake hits northern Chile", "c"),
            art("Earthquake of magnitude 7 hits northern Chile coast", "d"),
        ];
        let groups = cluster(&input, 0.6);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 3);
        assert_eq!(titles(&groups[1]), vec!["Parliament approves new budget"]);
    }

    #[test]
    fn compares_against_seed_only() {
        // b is close to both a and c, but a and c are far apart.
        let a = art("alpha beta gamma delta", "s1");
        let b = art("alpha beta gamma delta epsilon zeta", "s2");
        let c = art("gamma delta epsilon zeta eta theta", "s3");
        let params = ClusterParams::default();
        let ab = similarity_with(&a.title, &b.title, &params.similarity);
        let ac = similarity_with(&a.title, &c.title, &params.similarity);
        assert!(ab > 0.6 && ac <= 0.6, "fixture drifted: ab={ab} ac={ac}");

        let groups = cluster_with(&[a.clone(), b.clone(), c.clone()], &params);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members(), &[a, b]);
        assert_eq!(groups[1].members(), &[c]);
    }

    #[test]
    fn threshold_is_strict() {
        let a = art("Same title", "s1");
        let b = art("Same title", "s2");
        // similarity == 1.0, threshold 1.0 -> not strictly greater
        assert_eq!(cluster(&[a.clone(), b.clone()], 1.0).len(), 2);
        assert_eq!(cluster(&[a, b], 0.99).len(), 1);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(cluster(&[], 0.6).is_empty());
    }

    #[test]
    fn publishable_requires_distinct_sources() {
        let groups = cluster(
            &[
                art("Flood warning issued for Valencia", "El Pais"),
                art("Flood warning issued for Valencia", "el pais"),
                art("Wildfire spreads near Athens", "Reuters"),
                art("Wildfire spreads near Athens", "BBC"),
            ],
            0.6,
        );
        assert_eq!(groups.len(), 2);
        let (kept, dropped) = publishable(groups, 2);
        assert_eq!(dropped, 1);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].seed().title, "Wildfire spreads near Athens");
    }
}
