use axum::{http::StatusCode, routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<Option<PrometheusHandle>> = OnceCell::new();

/// Install the process-wide Prometheus recorder on first call.
/// `None` when another recorder was installed first.
pub fn handle() -> Option<PrometheusHandle> {
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(h) => {
                crate::ingest::ensure_metrics_described();
                Some(h)
            }
            Err(e) => {
                tracing::warn!(target: "metrics", error = %e, "prometheus recorder not installed");
                None
            }
        })
        .clone()
}

/// Router exposing `/metrics` with the Prometheus exposition format.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let handle = handle();
    Router::new().route(
        "/metrics",
        get(move || {
            let h = handle.clone();
            async move {
                match h {
                    Some(h) => (StatusCode::OK, h.render()),
                    None => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "metrics recorder unavailable".to_string(),
                    ),
                }
            }
        }),
    )
}
