//! HTTP route handlers for the MedienWald API.
//!
//! - `health`: liveness/readiness probes, metrics and version info
//! - `media`: byte-range streaming of library files
//! - `videos`: library listing and index status

pub mod health;
pub mod media;
pub mod videos;

use std::path::PathBuf;

use axum::http::header::{CONTENT_RANGE, CONTENT_TYPE};
use axum::middleware::from_fn_with_state;
use axum::{routing::get, Router};
use tower_http::compression::predicate::{DefaultPredicate, Predicate};
use tower_http::{
    compression::CompressionLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::middleware::security_headers::security_headers_middleware;
use crate::state::AppState;

/// Compression predicate that leaves media bodies and partial responses untouched,
/// so `Content-Length` and byte offsets stay exact.
#[derive(Clone)]
struct NoMediaDefault(DefaultPredicate);

impl Predicate for NoMediaDefault {
    fn should_compress<B: axum::body::HttpBody>(&self, res: &axum::http::Response<B>) -> bool {
        if res.headers().contains_key(CONTENT_RANGE) {
            return false;
        }
        if let Some(ct) = res.headers().get(CONTENT_TYPE) {
            if let Ok(s) = ct.to_str() {
                if s.starts_with("video/")
                    || s.starts_with("audio/")
                    || s.starts_with("application/octet-stream")
                {
                    return false;
                }
            }
        }
        self.0.should_compress(res)
    }
}

/// Builds the complete application router (API, media, optional static UI, layers).
pub fn build_router(state: AppState) -> Router {
    let compression = CompressionLayer::new().compress_when(NoMediaDefault(DefaultPredicate::new()));
    let cfg_arc = state.config.clone();
    let ui_dir = state.config.server.ui_dir.clone();

    let mut app = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/metrics/prometheus", get(health::metrics_prometheus))
        .route("/version", get(health::version))
        .route("/api/videos", get(videos::list_videos))
        .route("/api/library", get(videos::library_status))
        .route("/video/{*path}", get(media::stream_video))
        .with_state(state);

    // Static UI mit SPA-Fallback, nur wenn konfiguriert
    if let Some(dir) = ui_dir {
        let root = PathBuf::from(dir);
        let index = root.join("index.html");
        app = app.fallback_service(
            ServeDir::new(root)
                .append_index_html_on_directories(true)
                .not_found_service(ServeFile::new(index)),
        );
    }

    app.layer(compression)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(cfg_arc, security_headers_middleware))
}
