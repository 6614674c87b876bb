use crate::proxy::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use generation_cache::{CacheStats, CacheStore};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

fn hit_rate(stats: &CacheStats) -> f64 {
    let total = stats.hits + stats.misses;
    if total > 0 {
        stats.hits as f64 / total as f64
    } else {
        0.0
    }
}

/// GET /api/stats: lifecycle and storage snapshot.
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let layer = state.layer.load();
    let stats = state.storage.stats();
    let generations = state.storage.keys().unwrap_or_default();

    Json(serde_json::json!({
        "version": layer.version(),
        "phase": layer.phase().as_str(),
        "controlling": layer.is_controlling(),
        "skip_waiting": layer.skip_waiting(),
        "generations": generations,
        "cache": {
            "hits": stats.hits,
            "misses": stats.misses,
            "hit_rate": hit_rate(&stats),
            "puts": stats.puts,
            "rejected_puts": stats.rejected_puts,
            "entries": stats.entries,
            "bytes": stats.bytes,
        },
    }))
}

/// Admin router (separate port). `/metrics` is only mounted when a
/// Prometheus recorder could be installed.
pub fn admin_router(state: Arc<AppState>, prometheus: Option<PrometheusHandle>) -> Router {
    let router = Router::new().route("/api/stats", get(stats_handler));

    let router = match prometheus {
        Some(handle) => router.route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        ),
        None => router,
    };

    router.with_state(state)
}
