//! Request extraction.
//!
//! # Responsibilities
//! - Resolve the calling user from the `X-User-Id` header
//! - Reject unknown users before handlers run
//!
//! # Design Decisions
//! - Session handling lives in front of this service; it forwards the
//!   authenticated user id in a header
//! - Request IDs are assigned by the tower-http layers in server.rs

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;

use crate::error::AppError;
use crate::http::server::AppState;
use crate::store::UserRecord;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The registered user making the request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

fn user_id_header(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn lookup(state: &AppState, user_id: &str) -> Result<CurrentUser, AppError> {
    state
        .store
        .get_user(user_id)
        .map(CurrentUser)
        .ok_or(AppError::Unauthorized("Unknown user"))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = user_id_header(parts).ok_or(AppError::Unauthorized("Missing X-User-Id header"))?;
        lookup(state, user_id)
    }
}

impl OptionalFromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        match user_id_header(parts) {
            Some(user_id) => lookup(state, user_id).map(Some),
            None => Ok(None),
        }
    }
}
