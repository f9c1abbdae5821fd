// tests/votes_concurrency.rs
//
// Concurrent votes on the same blink must not lose updates; votes on different blinks
// must not interfere. Runs against the file store, which has no intrinsic atomicity.

use std::sync::Arc;

use blink_feed::models::{BlinkRecord, VoteType};
use blink_feed::store::{BlinkStore, FileStore, MemoryStore};
use blink_feed::votes::{apply_vote, VoteRequest};

fn req(user: &str, vote: &str) -> VoteRequest {
    VoteRequest::parse(Some(user), Some(vote), None).expect("valid vote")
}

async fn file_store_with(ids: &[&str]) -> (tempfile::TempDir, Arc<FileStore>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FileStore::open(dir.path()).await.expect("open store"));
    for id in ids {
        assert!(store
            .insert_new(BlinkRecord::new(*id, format!("title {id}")))
            .await
            .unwrap());
    }
    (dir, store)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_likes_on_one_blink_are_all_counted() {
    let (_dir, store) = file_store_with(&["hot"]).await;

    let mut handles = Vec::new();
    for i in 0..64 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            apply_vote(&*store, "hot", &req(&format!("user-{i}"), "like"))
                .await
                .expect("vote")
        }));
    }
    for h in handles {
        h.await.expect("join");
    }

    let r = store.get("hot").await.unwrap().unwrap();
    assert_eq!(r.votes.likes, 64);
    assert_eq!(r.votes.dislikes, 0);
    assert_eq!(r.user_votes.len(), 64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_switches_keep_counters_consistent() {
    let (_dir, store) = file_store_with(&["a", "b"]).await;

    for i in 0..20 {
        apply_vote(&*store, "a", &req(&format!("u{i}"), "like"))
            .await
            .unwrap();
    }

    // half switch to dislike on "a", everyone also votes on "b" in parallel
    let mut handles = Vec::new();
    for i in 0..20 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let user = format!("u{i}");
            if i % 2 == 0 {
                apply_vote(&*store, "a", &req(&user, "dislike"))
                    .await
                    .unwrap();
            }
            apply_vote(&*store, "b", &req(&user, "dislike"))
                .await
                .unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let a = store.get("a").await.unwrap().unwrap();
    assert_eq!((a.votes.likes, a.votes.dislikes), (10, 10));
    let likes_in_map = a.user_votes.values().filter(|v| **v == VoteType::Like).count();
    assert_eq!(likes_in_map as u64, a.votes.likes);

    let b = store.get("b").await.unwrap().unwrap();
    assert_eq!((b.votes.likes, b.votes.dislikes), (0, 20));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_store_serializes_the_same_way() {
    let store = Arc::new(MemoryStore::with_records(vec![BlinkRecord::new("m", "t")]));
    let mut handles = Vec::new();
    for i in 0..50 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let vote = if i % 5 == 0 { "dislike" } else { "like" };
            apply_vote(&*store, "m", &req(&format!("u{i}"), vote))
                .await
                .unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }
    let r = store.get("m").await.unwrap().unwrap();
    assert_eq!((r.votes.likes, r.votes.dislikes), (40, 10));
}

#[tokio::test]
async fn unknown_blink_is_not_found() {
    let (_dir, store) = file_store_with(&[]).await;
    let err = apply_vote(&*store, "ghost", &req("u1", "like"))
        .await
        .unwrap_err();
    assert!(matches!(err, blink_feed::BlinkError::NotFound(_)));
    // path-like ids are simply unknown
    let err = apply_vote(&*store, "../ghost", &req("u1", "like"))
        .await
        .unwrap_err();
    assert!(matches!(err, blink_feed::BlinkError::NotFound(_)));
}
