//! Blink feed service: binary entrypoint.
//! Boots the Axum HTTP server with shared state and the background collector.

use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // Picks up FEED_CONFIG_PATH, OPENAI_API_KEY, RUST_LOG.
    let _ = dotenvy::dotenv();

    blink_feed::init_tracing();

    let router = blink_feed::app()
        .await
        .map_err(shuttle_runtime::Error::Custom)?;

    Ok(router.into())
}
