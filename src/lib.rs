// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod state;
pub mod store;
pub mod summarizer;
pub mod tasks;
pub mod votes;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::FeedConfig;
pub use crate::error::{BlinkError, Result};
pub use crate::state::AppState;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default directive when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "blink_feed=info,warn";

/// Install a compact fmt subscriber. No-op when a global subscriber already exists
/// (the deploy runtime may install its own).
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

/// Load config, build shared state and the router. Spawns the collection scheduler
/// when collection is enabled.
pub async fn app() -> anyhow::Result<axum::Router> {
    let cfg = FeedConfig::load_default()?;
    let state = AppState::from_config(cfg).await?;

    if state.cfg.collection.enabled {
        ingest::scheduler::spawn_collection_scheduler(state.clone());
        tracing::info!(
            target: "collect",
            interval_secs = state.cfg.collection.interval_secs,
            "collection scheduler started"
        );
    }

    Ok(router(state))
}
