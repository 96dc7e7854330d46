use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    state::AppState,
    types::{LibraryStatus, ListQuery, VideoDto},
};

/// `GET /api/videos?refresh=bool` - the library index ordered by `(folder, name)`.
pub async fn list_videos(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Vec<VideoDto>>> {
    let snapshot = state.indexer.list(q.refresh).await?;
    Ok(Json(snapshot.entries().iter().map(VideoDto::from).collect()))
}

/// `GET /api/library` - snapshot metadata and per-folder totals.
pub async fn library_status(State(state): State<AppState>) -> AppResult<Json<LibraryStatus>> {
    let snapshot = state.indexer.list(false).await?;
    let root_name = state
        .resolver
        .root()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Json(LibraryStatus::from_snapshot(root_name, &snapshot)))
}
