use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

use crate::catalog::{ToolDraft, ToolRecord};
use crate::error::{AppError, AppResult};
use crate::http::cache::CachePreset;
use crate::http::request::CurrentUser;
use crate::http::server::AppState;
use crate::quota::{Eligibility, SubmissionOutcome};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub tool: ToolRecord,
    pub eligibility: Eligibility,
    pub user_total_submissions: u64,
}

pub async fn status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    let status = state.quota.status(&user.id)?;
    Ok((CachePreset::Private, Json(status)))
}

pub async fn stats(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    let preset = if user.is_some() {
        CachePreset::Private
    } else {
        CachePreset::Short
    };
    let stats = state.quota.stats(user.as_ref().map(|u| u.0.id.as_str()))?;
    Ok((preset, Json(stats)))
}

/// Submit a tool. Free submissions are catalogued immediately; billable ones
/// are parked in a checkout session and answered with 402.
pub async fn submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(draft): Json<ToolDraft>,
) -> AppResult<impl IntoResponse> {
    let record = draft.clone().into_record(&user.id)?;

    match state.quota.claim_free_submission(&user.id)? {
        SubmissionOutcome::Free {
            eligibility,
            tracking,
            ..
        } => {
            state.store.insert_tool(record.clone());
            tracing::info!(tool_id = %record.id, user_id = %user.id, "Tool submitted");
            Ok((
                StatusCode::CREATED,
                CachePreset::NoStore,
                Json(SubmissionReceipt {
                    tool: record,
                    eligibility,
                    user_total_submissions: tracking.total_submissions_count,
                }),
            ))
        }
        SubmissionOutcome::PaymentRequired(_) => {
            let session = state.checkout.open(&user.id, draft);
            Err(AppError::PaymentRequired(Box::new(session)))
        }
    }
}
