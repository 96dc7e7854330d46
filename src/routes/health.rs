use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

// Health check endpoint - lightweight
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// Readiness probe: library root must still be a readable directory, with timeout protection
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let root = state.resolver.root().to_path_buf();
    let probe = tokio::fs::read_dir(root);
    match tokio::time::timeout(std::time::Duration::from_secs(5), probe).await {
        Ok(Ok(_)) => (StatusCode::OK, "ready").into_response(),
        Ok(Err(e)) => (StatusCode::SERVICE_UNAVAILABLE, format!("not ready: {}", e)).into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready: timeout").into_response(),
    }
}

// Metrics endpoint: returns JSON snapshot
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.metrics.get_snapshot();
    Json(snapshot)
}

// Prometheus-compatible text exposition format
pub async fn metrics_prometheus(State(state): State<AppState>) -> impl IntoResponse {
    let m = state.metrics.get_snapshot();
    let body = format!(
        "# HELP medienwald_scans_started Total library scans started\n# TYPE medienwald_scans_started counter\nmedienwald_scans_started {}\n\
# HELP medienwald_scans_completed Total library scans completed\n# TYPE medienwald_scans_completed counter\nmedienwald_scans_completed {}\n\
# HELP medienwald_scans_failed Total library scans failed\n# TYPE medienwald_scans_failed counter\nmedienwald_scans_failed {}\n\
# HELP medienwald_subtree_failures Top-level folders omitted from a scan\n# TYPE medienwald_subtree_failures counter\nmedienwald_subtree_failures {}\n\
# HELP medienwald_cache_hits Listings served from the cached index\n# TYPE medienwald_cache_hits counter\nmedienwald_cache_hits {}\n\
# HELP medienwald_files_indexed Files in the latest index\n# TYPE medienwald_files_indexed gauge\nmedienwald_files_indexed {}\n\
# HELP medienwald_streams_started Media streams opened\n# TYPE medienwald_streams_started counter\nmedienwald_streams_started {}\n\
# HELP medienwald_streams_active Media streams in flight\n# TYPE medienwald_streams_active gauge\nmedienwald_streams_active {}\n\
# HELP medienwald_bytes_streamed Bytes sent in media bodies\n# TYPE medienwald_bytes_streamed counter\nmedienwald_bytes_streamed {}\n\
# HELP medienwald_range_rejections Requests answered with 416\n# TYPE medienwald_range_rejections counter\nmedienwald_range_rejections {}\n\
# HELP medienwald_access_denied Requests answered with 403\n# TYPE medienwald_access_denied counter\nmedienwald_access_denied {}\n\
# HELP medienwald_uptime_seconds Uptime seconds\n# TYPE medienwald_uptime_seconds gauge\nmedienwald_uptime_seconds {}\n",
        m.scans_started,
        m.scans_completed,
        m.scans_failed,
        m.subtree_failures,
        m.cache_hits,
        m.files_indexed,
        m.streams_started,
        m.streams_active,
        m.bytes_streamed,
        m.range_rejections,
        m.access_denied,
        m.uptime_seconds,
    );
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

// Version/Build info endpoint (JSON)
pub async fn version() -> impl IntoResponse {
    let body = serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "package": {
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "authors": env!("CARGO_PKG_AUTHORS"),
            "license": env!("CARGO_PKG_LICENSE"),
        },
        "build": {
            "profile": if cfg!(debug_assertions) { "debug" } else { "release" },
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }
    });
    (StatusCode::OK, Json(body))
}
