// tests/rss_collection.rs
//
// Feed fixtures through the RSS source into a file-backed collection run.

use std::sync::Arc;

use blink_feed::ingest::providers::RssSource;
use blink_feed::ingest::types::{ArticleSource, SharedSource};
use blink_feed::ingest::{collect_once, CollectParams};
use blink_feed::store::{BlinkStore, FileStore};
use blink_feed::summarizer::ExtractiveSummarizer;

fn fixture_sources() -> Vec<SharedSource> {
    vec![
        Arc::new(RssSource::from_fixture(
            "Alpha News",
            include_str!("fixtures/alpha_rss.xml"),
        )),
        Arc::new(RssSource::from_fixture(
            "Beta Daily",
            include_str!("fixtures/beta_rss.xml"),
        )),
    ]
}

#[tokio::test]
async fn fixtures_parse_with_stable_ids() {
    let alpha = RssSource::from_fixture("Alpha News", include_str!("fixtures/alpha_rss.xml"));
    let first = alpha.fetch_latest().await.unwrap();
    let second = alpha.fetch_latest().await.unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(
        first.iter().map(|a| &a.id).collect::<Vec<_>>(),
        second.iter().map(|a| &a.id).collect::<Vec<_>>()
    );
    assert_eq!(
        first[0].summary.as_deref(),
        Some("Port authorities halted traffic after heavy rain")
    );

    let beta = RssSource::from_fixture("Beta Daily", include_str!("fixtures/beta_rss.xml"));
    let items = beta.fetch_latest().await.unwrap();
    assert_eq!(items[0].title, "Flooding closes Valencia port again");
    assert_eq!(items[0].published_at.to_rfc3339(), "2024-06-01T09:30:00+00:00");
}

#[tokio::test]
async fn rss_to_file_store_round() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).await.unwrap();
    let params = CollectParams::default();

    let report = collect_once(&fixture_sources(), &ExtractiveSummarizer, &store, &params)
        .await
        .unwrap();
    assert_eq!(report.fetched, 5);
    assert_eq!(report.groups, 3);
    assert_eq!(report.published.len(), 2);

    let stored = store.list().await.unwrap();
    assert_eq!(stored.len(), 2);
    let valencia = stored
        .iter()
        .find(|b| b.title == "Flooding closes Valencia port")
        .expect("valencia blink");
    // most recent member wins
    assert_eq!(valencia.published_at.as_deref(), Some("2024-06-01T09:30:00Z"));
    let names: Vec<&str> = valencia
        .sources
        .iter()
        .filter_map(|s| s["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Alpha News", "Beta Daily"]);
    assert!(dir.path().join(format!("{}.json", valencia.id)).exists());

    // repeated run against the same directory publishes nothing
    let again = collect_once(&fixture_sources(), &ExtractiveSummarizer, &store, &params)
        .await
        .unwrap();
    assert!(again.published.is_empty());
    assert_eq!(store.list().await.unwrap().len(), 2);
}
