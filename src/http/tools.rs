use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::http::cache::CachePreset;
use crate::http::server::AppState;

pub async fn list_tools(State(state): State<AppState>) -> impl IntoResponse {
    (CachePreset::Short, Json(state.store.list_tools()))
}

pub async fn get_tool(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let tool = state
        .store
        .get_tool(&id)
        .ok_or_else(|| AppError::NotFound(format!("Tool {id} not found")))?;
    Ok((CachePreset::Medium, Json(tool)))
}

/// Scores for the rating widget, with the recommended source highlighted.
pub async fn get_tool_scores(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let tool = state
        .store
        .get_tool(&id)
        .ok_or_else(|| AppError::NotFound(format!("Tool {id} not found")))?;
    Ok((CachePreset::Medium, Json(tool.resolve_scores())))
}
