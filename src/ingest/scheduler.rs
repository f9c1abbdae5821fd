// src/ingest/scheduler.rs
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::state::AppState;

/// Spawn the periodic collection loop. The first run starts immediately.
pub fn spawn_collection_scheduler(state: AppState) -> JoinHandle<()> {
    let every = Duration::from_secs(state.cfg.collection.interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match state.collect_once().await {
                Ok(report) => tracing::info!(
                    target: "collect",
                    published = report.published.len(),
                    groups = report.groups,
                    next_in_secs = every.as_secs(),
                    "scheduled collection tick"
                ),
                Err(e) => tracing::error!(target: "collect", error = %e, "scheduled collection failed"),
            }
        }
    })
}
