use crate::api::InvalidateResponse;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use tagcache::{CacheStats, Tag};

/// GET /admin/cache
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

/// DELETE /admin/cache/tags/{tag}
pub async fn invalidate_tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    if tag.trim().is_empty() {
        return Err(ApiError::BadRequest("tag must not be empty".into()));
    }

    let removed = state.cache.invalidate(&Tag::new(tag.clone())).await?;
    tracing::info!("Manual invalidation of '{}' removed {} entries", tag, removed);
    Ok(Json(InvalidateResponse { tag, removed }))
}
