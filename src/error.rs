//! Request-level errors and their HTTP rendering.

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::catalog::DraftError;
use crate::payments::{CheckoutError, CheckoutSession};
use crate::quota::QuotaError;
use crate::scoring::ScoreError;
use crate::security::{RateLimitResult, SanitizeError};
use crate::store::StoreError;
use crate::time::now_millis;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] SanitizeError),

    #[error(transparent)]
    InvalidScore(#[from] ScoreError),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Payment required for this submission")]
    PaymentRequired(Box<CheckoutSession>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests")]
    RateLimited(RateLimitResult),

    #[error(transparent)]
    Quota(#[from] QuotaError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DraftError> for AppError {
    fn from(e: DraftError) -> Self {
        match e {
            DraftError::Sanitize(e) => AppError::Validation(e),
            DraftError::Score(e) => AppError::InvalidScore(e),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::NotFound(_) => AppError::NotFound(e.to_string()),
            CheckoutError::Expired(_) | CheckoutError::AlreadyCompleted(_) => {
                AppError::Conflict(e.to_string())
            }
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidScore(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Quota(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "E-VALIDATION",
            AppError::InvalidScore(_) => "E-SCORE-RANGE",
            AppError::Unauthorized(_) => "E-UNAUTHORIZED",
            AppError::PaymentRequired(_) => "E-PAYMENT-REQUIRED",
            AppError::NotFound(_) => "E-NOT-FOUND",
            AppError::Conflict(_) => "E-CONFLICT",
            AppError::RateLimited(_) => "E-RATE-LIMITED",
            AppError::Quota(_) | AppError::Store(_) => "E-INTERNAL",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let mut body = serde_json::json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });

        match &self {
            AppError::PaymentRequired(session) => {
                body["checkout"] = serde_json::json!({
                    "id": session.id,
                    "amountCents": session.amount_cents,
                    "currency": session.currency,
                    "expiresAt": session.expires_at,
                });
            }
            AppError::RateLimited(result) => {
                body["error"]["details"] = serde_json::json!({
                    "isLockedOut": result.is_locked_out,
                    "resetTime": result.reset_time,
                });
            }
            _ => {}
        }

        let mut response = (status, Json(body)).into_response();
        if let AppError::RateLimited(result) = &self {
            let headers = response.headers_mut();
            headers.insert("retry-after", HeaderValue::from(result.retry_after_secs(now_millis())));
            headers.insert("x-ratelimit-remaining", HeaderValue::from(0u32));
            headers.insert("x-ratelimit-reset", HeaderValue::from(result.reset_time));
        }
        response
    }
}

pub type AppResult<T> = Result<T, AppError>;
