use axum::{
    body::Body,
    extract::{RawPathParams, State},
    http::{header, HeaderMap},
    response::Response,
};
use tokio::task;
use tracing::{debug, warn};

use crate::{
    error::{AppError, AppResult, LibraryError},
    state::AppState,
    streaming::{compute_window, content_type_for, response_head, ChunkedStream},
};

/// `GET /video/{path}` - serves a library file, honoring a single-range `Range` header.
///
/// `path` is taken percent-encoded from the URI and decoded by the resolver, so every
/// encoding of a traversal sequence goes through the same containment check.
pub async fn stream_video(
    State(state): State<AppState>,
    params: RawPathParams,
    headers: HeaderMap,
) -> AppResult<Response> {
    let raw = params
        .iter()
        .find(|(key, _)| *key == "path")
        .map(|(_, value)| value.to_string())
        .unwrap_or_default();

    let resolver = state.resolver.clone();
    let requested = raw.clone();
    let path = match task::spawn_blocking(move || resolver.resolve(&requested)).await? {
        Ok(p) => p,
        Err(e) => {
            if matches!(e, LibraryError::AccessDenied(_)) {
                state.metrics.inc_access_denied();
                warn!(requested = %raw, "Rejected path outside library root");
            } else {
                debug!(requested = %raw, "Path not resolvable: {}", e);
            }
            return Err(e.into());
        }
    };

    let size = tokio::fs::metadata(&path)
        .await
        .map_err(|_| LibraryError::NotFound(raw.clone()))?
        .len();

    let range = match headers.get(header::RANGE) {
        None => None,
        Some(v) => match v.to_str() {
            Ok(s) => Some(s),
            Err(_) => {
                state.metrics.inc_range_rejections();
                return Err(AppError::RangeNotSatisfiable { total: size });
            }
        },
    };
    let window = compute_window(range, size).map_err(|e| {
        state.metrics.inc_range_rejections();
        debug!(requested = %raw, range = ?range, "Unsatisfiable range");
        e
    })?;

    let content_type = content_type_for(&path);
    let stream = ChunkedStream::open(
        &path,
        &window,
        state.config.streaming.chunk_size,
        state.shutdown.child_token(),
        state.metrics.clone(),
    )
    .await?;

    let (status, head) = response_head(&window, content_type);
    let mut res = Response::new(Body::from_stream(stream.into_stream()));
    *res.status_mut() = status;
    res.headers_mut().extend(head);
    Ok(res)
}
