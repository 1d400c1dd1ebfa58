use std::sync::Arc;

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::api_error::ApiError;
use crate::response_types::{AttributesResponse, SegmentsResponse, SyncResponse};

pub async fn list_segments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SegmentsResponse>, ApiError> {
    let segments = state.catalog.segments().await?;
    let status = state.sync.status().await?;
    Ok(Json(SegmentsResponse { success: true, segments, status }))
}

pub async fn list_attributes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AttributesResponse>, ApiError> {
    let attributes = state.catalog.attributes().await?;
    let count = state.catalog.attribute_count().await?;
    Ok(Json(AttributesResponse { success: true, attributes, count }))
}

/// Manual sync trigger. Shares the scheduler's overlap guard.
pub async fn sync_segments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SyncResponse>, ApiError> {
    match state.sync.try_sync().await? {
        Some(report) => Ok(Json(SyncResponse { success: true, report })),
        None => Err(ApiError::Conflict("Sync already in progress".to_owned())),
    }
}
