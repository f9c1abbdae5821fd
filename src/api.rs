//! HTTP surface: feed listing, detail, voting and background search.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::analyze::rank::{rank, rank_one, RankedBlink};
use crate::error::{BlinkError, Result};
use crate::models::VoteType;
use crate::state::AppState;
use crate::tasks::{submit_search, SearchTask};
use crate::votes::{apply_vote, VoteRequest};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/blinks", get(list_blinks))
        .route("/blinks/{id}", get(get_blink))
        .route("/blinks/{id}/vote", post(vote))
        .route("/search", post(search))
        .route("/search/{task_id}", get(search_status))
        .merge(crate::metrics::router::<AppState>())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn list_blinks(State(state): State<AppState>) -> Result<Json<Vec<RankedBlink>>> {
    let records = state.store.list().await?;
    Ok(Json(rank(records, state.hot_count())))
}

async fn get_blink(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RankedBlink>> {
    let records = state.store.list().await?;
    rank_one(records, &id, state.hot_count())
        .map(Json)
        .ok_or_else(|| BlinkError::NotFound(format!("blink '{id}'")))
}

/// Fields are optional so validation errors come back as 400, not as a decode rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoteBody {
    user_id: Option<String>,
    vote_type: Option<String>,
    previous_vote: Option<String>,
}

#[derive(Debug, Serialize)]
struct VoteResponse {
    #[serde(flatten)]
    blink: RankedBlink,
    #[serde(rename = "userVote")]
    user_vote: Option<VoteType>,
}

async fn vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<VoteBody>, JsonRejection>,
) -> Result<Json<VoteResponse>> {
    let Json(body) = body.map_err(|e| BlinkError::InvalidInput(e.body_text()))?;
    let req = VoteRequest::parse(
        body.user_id.as_deref(),
        body.vote_type.as_deref(),
        body.previous_vote.as_deref(),
    )?;
    let outcome = apply_vote(state.store.as_ref(), &id, &req).await?;
    let user_vote = outcome.transition.resulting_vote();

    // Position-dependent fields come from a full pass over current state.
    let records = state.store.list().await?;
    let blink = match rank_one(records, &id, state.hot_count()) {
        Some(b) => b,
        None => rank(vec![outcome.record], 0)
            .pop()
            .ok_or_else(|| BlinkError::NotFound(format!("blink '{id}'")))?,
    };
    Ok(Json(VoteResponse { blink, user_vote }))
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    query: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchAccepted {
    task_id: String,
    status: &'static str,
}

async fn search(
    State(state): State<AppState>,
    body: std::result::Result<Json<SearchBody>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(body) = body.map_err(|e| BlinkError::InvalidInput(e.body_text()))?;
    let task = submit_search(&state, body.query.as_deref().unwrap_or_default())?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SearchAccepted {
            task_id: task.task_id,
            status: "pending",
        }),
    ))
}

async fn search_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<SearchTask>> {
    state
        .tasks
        .get(&task_id)
        .map(Json)
        .ok_or_else(|| BlinkError::NotFound(format!("task '{task_id}'")))
}
