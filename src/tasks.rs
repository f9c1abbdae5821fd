//! Background search tasks.
//!
//! A task is created `pending` on submission, moves to `running` when the worker picks
//! it up and ends in `completed` or `error`. Terminal tasks are frozen: later updates
//! are ignored.
//!
//! At most `tasks.max_concurrent` searches run at once; the rest stay `pending` until a
//! permit frees up. The in-memory store drops finished tasks after `tasks.ttl_secs` and
//! refuses new ones once `tasks.max_tasks` live tasks are held.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{SecondsFormat, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use crate::analyze::similarity::normalize;
use crate::config::TasksConfig;
use crate::error::{BlinkError, Result};
use crate::ingest::{fetch_all, filter_by_query, publish_articles, CollectionReport};
use crate::models::content_hash;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Error,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTask {
    pub task_id: String,
    pub query: String,
    pub status: TaskStatus,
    pub created_at: String,
    pub updated_at: String,
    /// Articles that matched the query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CollectionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl SearchTask {
    pub fn new(query: impl Into<String>) -> Self {
        static SEQ: AtomicU64 = AtomicU64::new(0);
        let query = query.into();
        let seq = SEQ.fetch_add(1, Ordering::Relaxed).to_string();
        let nanos = Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .to_string();
        let ts = now_rfc3339();
        Self {
            task_id: content_hash([query.as_str(), nanos.as_str(), seq.as_str()]),
            query,
            status: TaskStatus::Pending,
            created_at: ts.clone(),
            updated_at: ts,
            matched: None,
            result: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = TaskStatus::Running;
        self.updated_at = now_rfc3339();
    }

    pub fn mark_completed(&mut self, matched: usize, report: CollectionReport) {
        self.status = TaskStatus::Completed;
        self.matched = Some(matched);
        self.result = Some(report);
        self.updated_at = now_rfc3339();
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = TaskStatus::Error;
        self.error = Some(message.into());
        self.updated_at = now_rfc3339();
    }
}

pub trait TaskStore: Send + Sync {
    /// `false` when the store is full and the task was not kept.
    fn insert(&self, task: SearchTask) -> bool;

    fn get(&self, id: &str) -> Option<SearchTask>;

    /// Mutate a non-terminal task. Terminal tasks come back unchanged and the mutator
    /// is not called. `None` for an unknown id.
    fn update(&self, id: &str, mutator: &mut dyn FnMut(&mut SearchTask)) -> Option<SearchTask>;
}

pub type SharedTaskStore = Arc<dyn TaskStore>;

struct Slot {
    task: SearchTask,
    seq: u64,
    finished: Option<Instant>,
}

pub struct InMemoryTaskStore {
    inner: RwLock<HashMap<String, Slot>>,
    next_seq: AtomicU64,
    max_tasks: usize,
    ttl: Duration,
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::from_config(&TasksConfig::default())
    }
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &TasksConfig) -> Self {
        Self::with_limits(cfg.max_tasks, Duration::from_secs(cfg.ttl_secs))
    }

    pub fn with_limits(max_tasks: usize, ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            max_tasks: max_tasks.max(1),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl TaskStore for InMemoryTaskStore {
    fn insert(&self, task: SearchTask) -> bool {
        let mut map = self.inner.write();
        let ttl = self.ttl;
        map.retain(|_, slot| !slot.finished.is_some_and(|at| at.elapsed() >= ttl));

        while map.len() >= self.max_tasks {
            let oldest = map
                .iter()
                .filter(|(_, slot)| slot.finished.is_some())
                .min_by_key(|(_, slot)| slot.seq)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    map.remove(&id);
                }
                None => return false,
            }
        }

        let finished = task.status.is_terminal().then(Instant::now);
        let slot = Slot {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            finished,
            task,
        };
        map.insert(slot.task.task_id.clone(), slot);
        true
    }

    fn get(&self, id: &str) -> Option<SearchTask> {
        self.inner.read().get(id).map(|slot| slot.task.clone())
    }

    fn update(&self, id: &str, mutator: &mut dyn FnMut(&mut SearchTask)) -> Option<SearchTask> {
        let mut map = self.inner.write();
        let slot = map.get_mut(id)?;
        if !slot.task.status.is_terminal() {
            mutator(&mut slot.task);
            if slot.task.status.is_terminal() {
                slot.finished = Some(Instant::now());
            }
        }
        Some(slot.task.clone())
    }
}

/// Validate the query, register a pending task and run it in the background.
pub fn submit_search(state: &AppState, query: &str) -> Result<SearchTask> {
    let query = query.trim();
    if normalize(query).is_empty() {
        return Err(BlinkError::InvalidInput("query must not be empty".into()));
    }
    let task = SearchTask::new(query);
    if !state.tasks.insert(task.clone()) {
        warn!(target: "tasks", "search rejected, task store full");
        return Err(BlinkError::Busy("too many searches in flight".into()));
    }
    info!(target: "tasks", task_id = %task.task_id, "search submitted");

    let worker = state.clone();
    let task_id = task.task_id.clone();
    let query = task.query.clone();
    tokio::spawn(async move {
        run_search(&worker, &task_id, &query).await;
    });
    Ok(task)
}

/// Fetch, keep articles matching every query term, and publish them.
pub async fn run_search(state: &AppState, task_id: &str, query: &str) {
    let _permit = match state.search_permits.acquire().await {
        Ok(p) => p,
        Err(e) => {
            let msg = e.to_string();
            state.tasks.update(task_id, &mut |t: &mut SearchTask| t.mark_failed(msg.clone()));
            return;
        }
    };
    state.tasks.update(task_id, &mut |t: &mut SearchTask| t.mark_running());

    let (articles, source_errors) = fetch_all(&state.sources).await;
    let matched = filter_by_query(articles, query, &state.cfg.similarity);
    let n = matched.len();
    let params = state.collect_params();

    match publish_articles(matched, state.summarizer.as_ref(), state.store.as_ref(), &params).await
    {
        Ok(mut report) => {
            report.source_errors = source_errors;
            info!(
                target: "tasks",
                task_id,
                matched = n,
                published = report.published.len(),
                "search completed"
            );
            state
                .tasks
                .update(task_id, &mut |t: &mut SearchTask| t.mark_completed(n, report.clone()));
        }
        Err(e) => {
            warn!(target: "tasks", task_id, error = %e, "search failed");
            let msg = e.to_string();
            state.tasks.update(task_id, &mut |t: &mut SearchTask| t.mark_failed(msg.clone()));
        }
    }
}
