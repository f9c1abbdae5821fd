// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt as _; // for `oneshot`

use blink_feed::models::BlinkRecord;
use blink_feed::store::{MemoryStore, SharedStore};
use blink_feed::summarizer::ExtractiveSummarizer;
use blink_feed::{router, AppState, FeedConfig};

const BODY_LIMIT: usize = 1024 * 1024;

fn blink(id: &str, likes: u64, dislikes: u64, hours_ago: i64) -> BlinkRecord {
    let mut r = BlinkRecord::new(id, format!("Blink {id}"));
    r.votes.likes = likes;
    r.votes.dislikes = dislikes;
    r.published_at = Some((Utc::now() - ChronoDuration::hours(hours_ago)).to_rfc3339());
    r.sources = vec![json!({"name": "Alpha", "url": format!("https://a.test/{id}")})];
    r.content.insert("category".into(), json!("world"));
    r
}

fn test_state() -> AppState {
    let store: SharedStore = Arc::new(MemoryStore::with_records(vec![
        blink("D", 0, 5, 4),
        blink("C", 1, 0, 3),
        blink("E", 0, 0, 5),
        blink("A", 10, 0, 1),
        blink("B", 5, 0, 2),
    ]));
    AppState::new(
        store,
        Arc::new(ExtractiveSummarizer),
        Vec::new(),
        FeedConfig::default(),
    )
}

fn test_router() -> Router {
    router(test_state())
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, v)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET")
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST")
}

#[tokio::test]
async fn health_returns_ok() {
    let app = test_router();
    let resp = app.oneshot(get("/health")).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), "ok");
}

#[tokio::test]
async fn list_is_ranked_and_hot_flagged() {
    let app = test_router();
    let (status, v) = send(&app, get("/blinks")).await;
    assert_eq!(status, StatusCode::OK);

    let items = v.as_array().expect("array");
    let ids: Vec<&str> = items.iter().map(|b| b["id"].as_str().unwrap()).collect();
    // E has no votes (50%) and sits between the 100% group and D (0%)
    assert_eq!(ids, vec!["A", "B", "C", "E", "D"]);

    let hot: Vec<bool> = items.iter().map(|b| b["isHot"].as_bool().unwrap()).collect();
    assert_eq!(hot, vec![true, true, true, true, false]);

    assert_eq!(items[3]["interest"], json!(50.0));
    assert_eq!(items[4]["interest"], json!(0.0));
    assert_eq!(items[0]["votes"]["likes"], json!(10));
    // opaque content survives
    assert_eq!(items[0]["category"], json!("world"));
    assert!(items[0]["sources"].is_array());
    assert!(items[0]["publishedAt"].is_string());
}

#[tokio::test]
async fn detail_uses_full_ranking_for_hot_flag() {
    let app = test_router();
    let (status, v) = send(&app, get("/blinks/D")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["id"], "D");
    assert_eq!(v["isHot"], json!(false));
    assert_eq!(v["interest"], json!(0.0));

    let (_, a) = send(&app, get("/blinks/A")).await;
    assert_eq!(a["isHot"], json!(true));

    let (status, err) = send(&app, get("/blinks/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(err["error"].is_string());
}

#[tokio::test]
async fn vote_validation_errors() {
    let app = test_router();

    let (s, _) = send(&app, post_json("/blinks/A/vote", json!({"voteType": "like"}))).await;
    assert_eq!(s, StatusCode::BAD_REQUEST, "missing userId");

    let (s, _) = send(
        &app,
        post_json("/blinks/A/vote", json!({"userId": "u1", "voteType": "love"})),
    )
    .await;
    assert_eq!(s, StatusCode::BAD_REQUEST, "bad voteType");

    let (s, _) = send(
        &app,
        post_json("/blinks/missing/vote", json!({"userId": "u1", "voteType": "like"})),
    )
    .await;
    assert_eq!(s, StatusCode::NOT_FOUND);

    let req = Request::builder()
        .method("POST")
        .uri("/blinks/A/vote")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (s, _) = send(&app, req).await;
    assert_eq!(s, StatusCode::BAD_REQUEST, "malformed body");
}

#[tokio::test]
async fn vote_cast_retract_and_switch() {
    let app = test_router();

    // E: no votes yet
    let (s, v) = send(
        &app,
        post_json("/blinks/E/vote", json!({"userId": "u1", "voteType": "like"})),
    )
    .await;
    assert_eq!(s, StatusCode::OK);
    assert_eq!(v["votes"]["likes"], json!(1));
    assert_eq!(v["interest"], json!(100.0));
    assert_eq!(v["userVote"], json!("like"));

    // same action again retracts
    let (_, v) = send(
        &app,
        post_json(
            "/blinks/E/vote",
            json!({"userId": "u1", "voteType": "like", "previousVote": "like"}),
        ),
    )
    .await;
    assert_eq!(v["votes"]["likes"], json!(0));
    assert_eq!(v["interest"], json!(50.0));
    assert_eq!(v["userVote"], Value::Null);
    assert!(v["user_votes"].get("u1").is_none());

    // like then dislike switches; a stale hint does not matter
    send(
        &app,
        post_json("/blinks/E/vote", json!({"userId": "u2", "voteType": "like"})),
    )
    .await;
    let (_, v) = send(
        &app,
        post_json(
            "/blinks/E/vote",
            json!({"userId": "u2", "voteType": "dislike", "previousVote": null}),
        ),
    )
    .await;
    assert_eq!(v["votes"]["likes"], json!(0));
    assert_eq!(v["votes"]["dislikes"], json!(1));
    assert_eq!(v["user_votes"]["u2"], json!("dislike"));
    assert_eq!(v["userVote"], json!("dislike"));

    // a subsequent read observes the committed vote
    let (_, detail) = send(&app, get("/blinks/E")).await;
    assert_eq!(detail["votes"]["dislikes"], json!(1));
    assert_eq!(detail["interest"], json!(0.0));
    assert!(detail.get("userVote").is_none());
}

#[tokio::test]
async fn search_lifecycle() {
    let app = test_router();

    let (s, _) = send(&app, post_json("/search", json!({"query": "   "}))).await;
    assert_eq!(s, StatusCode::BAD_REQUEST);
    let (s, _) = send(&app, post_json("/search", json!({}))).await;
    assert_eq!(s, StatusCode::BAD_REQUEST);

    let (s, v) = send(&app, post_json("/search", json!({"query": "valencia storm"}))).await;
    assert_eq!(s, StatusCode::ACCEPTED);
    assert_eq!(v["status"], "pending");
    let task_id = v["taskId"].as_str().expect("taskId").to_string();

    // no sources configured: the task completes with nothing matched
    let mut last = Value::Null;
    for _ in 0..50 {
        let (s, t) = send(&app, get(&format!("/search/{task_id}"))).await;
        assert_eq!(s, StatusCode::OK);
        last = t;
        if last["status"] == "completed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(last["status"], "completed");
    assert_eq!(last["matched"], json!(0));
    assert_eq!(last["result"]["published"], json!([]));

    let (s, _) = send(&app, get("/search/unknown")).await;
    assert_eq!(s, StatusCode::NOT_FOUND);
}
