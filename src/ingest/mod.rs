// src/ingest/mod.rs
pub mod pipeline;
pub mod providers;
pub mod scheduler;
pub mod types;

use std::collections::HashSet;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

use crate::analyze::similarity::{keywords, normalize, SimilarityParams};
use crate::ingest::types::SharedSource;
use crate::models::RawArticle;

pub use pipeline::{collect_once, publish_articles, CollectParams, CollectionReport};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("collect_runs_total", "Collection runs started.");
        describe_counter!(
            "collect_groups_published_total",
            "Groups published as new blinks."
        );
        describe_counter!(
            "collect_groups_skipped_total",
            "Groups skipped, labelled by reason."
        );
        describe_counter!(
            "collect_upstream_failures_total",
            "Groups dropped because the summarizer failed."
        );
        describe_counter!(
            "collect_source_errors_total",
            "Article source fetch/parse errors."
        );
        describe_counter!("ingest_articles_total", "Articles parsed from feeds.");
        describe_counter!("votes_applied_total", "Votes committed, by transition.");
        describe_counter!("votes_rejected_total", "Votes rejected, by reason.");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_histogram!("cluster_group_size", "Articles per clustered group.");
        describe_gauge!("collect_last_run_ts", "Unix ts when collection last ran.");
    });
}

/// Normalize text: collapse whitespace, trim, strip stray punctuation.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    out = out.split_whitespace().collect::<Vec<_>>().join(" ");

    // 5) Strip trailing sentence punctuation (keep quotes)
    while let Some(last) = out.chars().last() {
        if matches!(last, '!' | '?' | '.' | ',') {
            out.pop();
        } else {
            break;
        }
    }

    // 6) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Pull from every source. A failing source is logged and counted; the rest continue.
/// Returns (articles, failed source count).
pub async fn fetch_all(sources: &[SharedSource]) -> (Vec<RawArticle>, usize) {
    ensure_metrics_described();

    let mut raw = Vec::new();
    let mut errors = 0usize;
    for s in sources {
        match s.fetch_latest().await {
            Ok(mut v) => {
                tracing::debug!(target: "collect", source = s.name(), items = v.len(), "source fetched");
                raw.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(target: "collect", error = ?e, source = s.name(), "source error");
                counter!("collect_source_errors_total").increment(1);
                errors += 1;
            }
        }
    }
    (raw, errors)
}

/// Drop empty titles and repeated ids; first occurrence wins.
pub fn prepare_articles(articles: Vec<RawArticle>) -> Vec<RawArticle> {
    let mut seen: HashSet<String> = HashSet::new();
    articles
        .into_iter()
        .filter(|a| !a.title.trim().is_empty())
        .filter(|a| seen.insert(a.id.clone()))
        .collect()
}

/// Search terms of a free-text query: its keywords, or every token when the query
/// consists only of short or stop words.
pub fn query_terms(query: &str, params: &SimilarityParams) -> Vec<String> {
    let norm = normalize(query);
    let kws = keywords(&norm, params.min_keyword_len);
    if kws.is_empty() {
        norm.split_whitespace().map(str::to_string).collect()
    } else {
        kws.into_iter().collect()
    }
}

/// Articles whose title or summary contains every query term.
pub fn filter_by_query(
    articles: Vec<RawArticle>,
    query: &str,
    params: &SimilarityParams,
) -> Vec<RawArticle> {
    let terms = query_terms(query, params);
    if terms.is_empty() {
        return Vec::new();
    }
    articles
        .into_iter()
        .filter(|a| {
            let hay = normalize(&format!(
                "{} {}",
                a.title,
                a.summary.as_deref().unwrap_or_default()
            ));
            let tokens: HashSet<&str> = hay.split_whitespace().collect();
            terms.iter().all(|t| tokens.contains(t.as_str()))
        })
        .collect()
}
