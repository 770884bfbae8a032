use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::http::cache::CachePreset;
use crate::http::server::AppState;
use crate::security::sanitize::{sanitize_email, sanitize_name};
use crate::security::{keys_match, ActionType, ClientIdentifier};
use crate::time::now_millis;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub api_key: String,
}

pub async fn signup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SignupRequest>,
) -> AppResult<impl IntoResponse> {
    let client = ClientIdentifier::from_headers(&headers);
    let limit = state.limiter.check(&client, ActionType::Signup);
    if !limit.allowed {
        return Err(AppError::RateLimited(limit));
    }

    let name = sanitize_name(&request.name)?;
    let email = sanitize_email(&request.email)?;

    let user = state
        .store
        .create_user(name, email, now_millis())
        .ok_or_else(|| AppError::Conflict("Email already registered".into()))?;
    state.quota.user_tracking(&user.id)?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, CachePreset::NoStore, Json(user)))
}

/// Admin login. Every attempt counts against the `login` bucket; success
/// clears it.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let client = ClientIdentifier::from_headers(&headers);
    let limit = state.limiter.check(&client, ActionType::Login);
    if !limit.allowed {
        return Err(AppError::RateLimited(limit));
    }

    if !keys_match(&request.api_key, &state.config.load().admin.api_key) {
        tracing::warn!(client = %client, remaining = limit.remaining, "Failed login attempt");
        return Err(AppError::Unauthorized("Invalid credentials"));
    }

    state.limiter.reset(&client, ActionType::Login);
    Ok((
        CachePreset::NoStore,
        Json(serde_json::json!({ "authenticated": true })),
    ))
}
