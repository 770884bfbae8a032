use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::http::server::AppState;
use crate::security::{keys_match, ActionType, ClientIdentifier};

/// Bearer API key check for the admin routes.
///
/// Bad keys count against the client's `login` bucket, so guessing the key
/// here runs into the same lockout as the login route.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = ClientIdentifier::from_headers(request.headers());
    if let Some(locked) = state.limiter.active_lockout(&client, ActionType::Login) {
        return AppError::RateLimited(locked).into_response();
    }

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let authorized = presented.is_some_and(|key| keys_match(key, &state.config.load().admin.api_key));
    if authorized {
        return next.run(request).await;
    }

    let result = state.limiter.record_failed_attempt(&client, ActionType::Login);
    tracing::warn!(client = %client, remaining = result.remaining, "Rejected admin request");
    if !result.allowed {
        return AppError::RateLimited(result).into_response();
    }
    AppError::Unauthorized("Invalid admin API key").into_response()
}
