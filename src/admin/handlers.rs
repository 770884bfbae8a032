use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::http::cache::CachePreset;
use crate::http::server::AppState;
use crate::scoring::{AggregatedScore, EditorialScore};
use crate::security::sanitize::sanitize_text;
use crate::time::now_millis;

const MAX_NOTES_LEN: usize = 1000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub users: usize,
    pub tools: usize,
    pub pending_checkouts: usize,
    pub total_submissions: u64,
    pub free_submission_threshold: u64,
}

#[derive(Debug, Deserialize)]
pub struct ThresholdUpdate {
    pub threshold: u64,
}

pub async fn get_status(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let stats = state.quota.stats(None)?;
    Ok((
        CachePreset::NoStore,
        Json(SystemStatus {
            version: env!("CARGO_PKG_VERSION"),
            status: "operational",
            uptime_secs: state.started_at.elapsed().as_secs(),
            users: state.store.user_count(),
            tools: state.store.tool_count(),
            pending_checkouts: state.checkout.pending_count(),
            total_submissions: stats.total_submissions,
            free_submission_threshold: stats.free_submission_threshold,
        }),
    ))
}

pub async fn set_free_threshold(
    State(state): State<AppState>,
    Json(update): Json<ThresholdUpdate>,
) -> AppResult<impl IntoResponse> {
    state.quota.set_threshold(update.threshold)?;
    let stats = state.quota.stats(None)?;
    Ok((CachePreset::NoStore, Json(stats)))
}

pub async fn set_editorial_score(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut score): Json<EditorialScore>,
) -> AppResult<impl IntoResponse> {
    score.scores.validate()?;
    score.notes = score.notes.map(|n| sanitize_text(&n, MAX_NOTES_LEN));

    let tool = state
        .store
        .update_tool(&id, |tool| {
            tool.editorial = Some(score);
            tool.updated_at = now_millis();
        })
        .ok_or_else(|| AppError::NotFound(format!("Tool {id} not found")))?;

    tracing::info!(tool_id = %id, "Editorial score updated");
    Ok((CachePreset::NoStore, Json(tool.resolve_scores())))
}

pub async fn set_aggregated_score(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(score): Json<AggregatedScore>,
) -> AppResult<impl IntoResponse> {
    score.validate()?;

    let tool = state
        .store
        .update_tool(&id, |tool| {
            tool.aggregated = Some(score);
            tool.updated_at = now_millis();
        })
        .ok_or_else(|| AppError::NotFound(format!("Tool {id} not found")))?;

    tracing::info!(tool_id = %id, "Aggregated score updated");
    Ok((CachePreset::NoStore, Json(tool.resolve_scores())))
}

/// Mark a checkout paid: catalogue its parked draft and count the submission.
pub async fn complete_checkout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let session = state.checkout.complete(&id)?;

    // Completion is claimed first so concurrent webhooks cannot double count;
    // a failure afterwards hands the session back for a retry.
    let counted = session
        .draft
        .into_record(&session.user_id)
        .map_err(AppError::from)
        .and_then(|record| {
            state.quota.record_paid_submission(&session.user_id)?;
            Ok(record)
        });
    let record = match counted {
        Ok(record) => record,
        Err(e) => {
            state.checkout.reopen(&id);
            return Err(e);
        }
    };
    state.store.insert_tool(record.clone());

    tracing::info!(
        checkout_id = %id,
        tool_id = %record.id,
        user_id = %session.user_id,
        "Checkout completed"
    );
    Ok((StatusCode::CREATED, CachePreset::NoStore, Json(record)))
}
